//! YAML canonical document format

use crate::error::{EditorError, EditorResult, ParseError};
use crate::services::DocumentCodec;
use topo_model::Document;

/// Reads and writes documents as YAML
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlDocumentCodec;

impl DocumentCodec for YamlDocumentCodec {
    fn parse(&self, bytes: &[u8]) -> Result<Document, ParseError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ParseError::Encoding)?;
        serde_yaml::from_str(text).map_err(|e| ParseError::Syntax(e.to_string()))
    }

    fn serialize(&self, document: &Document) -> EditorResult<Vec<u8>> {
        serde_yaml::to_string(document)
            .map(String::into_bytes)
            .map_err(|e| EditorError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topo_model::Element;

    #[test]
    fn serialized_documents_parse_back() {
        let mut doc = Document::new("doc-1", "web", "1.0.0-SNAPSHOT");
        doc.elements
            .insert("Server".into(), Element::new("Server", "Compute:1.0"));
        let bytes = YamlDocumentCodec.serialize(&doc).unwrap();
        assert_eq!(YamlDocumentCodec.parse(&bytes).unwrap(), doc);
    }

    #[test]
    fn invalid_utf8_is_an_encoding_error() {
        let err = YamlDocumentCodec.parse(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, ParseError::Encoding));
    }

    #[test]
    fn missing_fields_are_syntax_errors() {
        let err = YamlDocumentCodec.parse(b"archive_name: web\n").unwrap_err();
        assert!(matches!(err, ParseError::Syntax(_)));
    }
}
