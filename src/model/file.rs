use crate::error::Re;
use crate::model::record::{decode_error, Record, Value};
use crate::model::{Collection, Id};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// A stored binary attachment, typically the invoice for an expense.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    /// The original filename.
    pub name: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(with = "base64_data", default)]
    pub data: Vec<u8>,
}

/// An invoice supplied alongside a new expense.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct InvoiceUpload {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InvoiceUpload {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Returns `None` for an empty payload, which is treated as no attachment at all.
    pub(crate) fn into_attachment(self) -> Option<FileAttachment> {
        if self.data.is_empty() {
            return None;
        }
        Some(FileAttachment {
            id: None,
            name: self.name,
            mime_type: self.mime_type,
            size: self.data.len() as u64,
            data: self.data,
        })
    }
}

impl Record for FileAttachment {
    const COLLECTION: Collection = Collection::Files;
    const COLUMNS: &'static [&'static str] = &["name", "mime_type", "size", "data"];

    fn id(&self) -> Option<Id> {
        self.id
    }

    fn values(&self) -> Re<Vec<Value>> {
        let size = i64::try_from(self.size)
            .with_context(|| format!("File size {} is too large to store", self.size))?;
        Ok(vec![
            self.name.clone().into(),
            self.mime_type.clone().into(),
            size.into(),
            self.data.clone().into(),
        ])
    }
}

impl<'r> FromRow<'r, SqliteRow> for FileAttachment {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        let size: i64 = row.try_get("size")?;
        let size = u64::try_from(size).map_err(|e| decode_error("size", e))?;
        Ok(Self {
            id: Some(row.try_get("id")?),
            name: row.try_get("name")?,
            mime_type: row.try_get("mime_type")?,
            size,
            data: row.try_get("data")?,
        })
    }
}

/// Guesses a MIME type from a filename extension.
pub fn mime_type_for(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        _ => "application/octet-stream",
    }
}

/// Serializes binary payloads as standard base64 strings.
mod base64_data {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_upload_is_no_attachment() {
        let upload = InvoiceUpload::new("empty.pdf", "application/pdf", Vec::new());
        assert!(upload.into_attachment().is_none());
    }

    #[test]
    fn test_upload_size_from_payload() {
        let upload = InvoiceUpload::new("inv.pdf", "application/pdf", vec![1, 2, 3, 4]);
        let file = upload.into_attachment().unwrap();
        assert_eq!(file.size, 4);
        assert_eq!(file.id, None);
    }

    #[test]
    fn test_json_uses_type_and_base64() {
        let file = FileAttachment {
            id: Some(2),
            name: "a.txt".into(),
            mime_type: "text/plain".into(),
            size: 5,
            data: b"hello".to_vec(),
        };
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["type"], "text/plain");
        assert_eq!(json["data"], "aGVsbG8=");
        let back: FileAttachment = serde_json::from_value(json).unwrap();
        assert_eq!(back, file);
    }

    #[test]
    fn test_bad_base64_is_rejected() {
        let json = r#"{"id":1,"name":"x","type":"text/plain","size":1,"data":"%%%"}"#;
        assert!(serde_json::from_str::<FileAttachment>(json).is_err());
    }

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for("Invoice-2024.PDF"), "application/pdf");
        assert_eq!(mime_type_for("receipt.jpeg"), "image/jpeg");
        assert_eq!(mime_type_for("noextension"), "application/octet-stream");
    }
}
