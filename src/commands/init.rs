use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Creates the data directory, its subdirectories and:
/// - Creates an initial `config.json` file with default settings
/// - Creates an empty ledger store
///
/// # Arguments
/// - `accountant_home` - The directory that will be the root of data directory, e.g.
///   `$HOME/accountant`
///
/// # Errors
/// - Returns a `Config` error if a configuration already exists or any file operation fails.
/// - Returns an `Initialization` error if the ledger store cannot be created.
pub async fn init(accountant_home: &Path) -> Result<Out<()>> {
    let config = Config::create(accountant_home).await?;
    Ok(format!(
        "Successfully created the accountant directory at {}",
        config.root().display()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorType;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_then_init_again() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("books");
        let out = init(&home).await.unwrap();
        assert!(out.message().contains("Successfully created"));
        assert!(home.join("config.json").is_file());

        let e = init(&home).await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Config);
    }
}
