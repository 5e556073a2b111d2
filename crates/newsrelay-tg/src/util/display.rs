use std::time::Duration;

pub(crate) fn human_duration(duration: Duration) -> String {
    timeago::Formatter::new()
        .num_items(2)
        .ago("")
        .convert(duration)
}
