use crate::args::FileGetArgs;
use crate::commands::Out;
use crate::error::{Error, ErrorType, IntoResult};
use crate::{utils, Config, Result};
use std::path::PathBuf;

/// Writes the stored file `args.id` to `args.out`, or to its original name in the current
/// directory, and returns the path written.
pub async fn get_file(config: Config, args: FileGetArgs) -> Result<Out<PathBuf>> {
    let id = args.id;
    let file = config
        .ledger()
        .get_file(id)
        .await?
        .ok_or_else(|| Error::validation(format!("There is no file with ID {id}")))?;

    let path = match args.out {
        Some(path) => path,
        None if file.name.trim().is_empty() => PathBuf::from(format!("file-{id}")),
        // Only the final component of the stored name is used.
        None => PathBuf::from(utils::file_name(&PathBuf::from(&file.name))),
    };
    utils::write(&path, &file.data)
        .await
        .pub_result(ErrorType::Io)?;

    Ok(Out::new(
        format!(
            "Wrote file {id} '{}' ({}, {} bytes) to {}",
            file.name,
            file.mime_type,
            file.size,
            path.display()
        ),
        path,
    ))
}
