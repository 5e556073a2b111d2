use super::{err, ErrorKind, Result};
use easy_ext::ext;

#[ext(OptionExt)]
pub(crate) impl<T> Option<T> {
    #[track_caller]
    fn fatal_ctx<S>(self, message: impl FnOnce() -> S) -> Result<T>
    where
        S: Into<String>,
    {
        match self {
            Some(value) => Ok(value),
            None => Err(err!(ErrorKind::Fatal {
                message: message(),
                source: None,
            })),
        }
    }
}
