#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid container name `{0}`: must be an absolute, slash-rooted path")]
    InvalidName(String),
}
pub type Result<T> = std::result::Result<T, Error>;
