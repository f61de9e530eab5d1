use anyhow::Result;

/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "token";

/// Persistent key/value storage for session state.
///
/// The controller only ever touches the token through this trait, so a
/// store can be swapped for an in-memory one in tests. Implementations are
/// used from the UI thread only.
pub trait SessionStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;

    fn token(&self) -> Result<Option<String>> {
        self.get(TOKEN_KEY)
    }
}
