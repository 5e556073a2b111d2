use chrono::prelude::*;
use easy_ext::ext;

#[ext(DateTimeExt)]
pub(crate) impl<Tz: chrono::TimeZone> DateTime<Tz> {
    fn to_human_readable(&self) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        self.with_timezone(&Utc)
            .format("%Y-%m-%d %H:%M:%S (UTC)")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn formats_in_utc() {
        let offset = FixedOffset::east_opt(2 * 60 * 60).unwrap();
        let time = offset.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();

        expect!["2024-03-01 10:30:05 (UTC)"].assert_eq(&time.to_human_readable());
    }
}
