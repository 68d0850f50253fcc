//! # Wire Codec
//!
//! Textual CDM documents.
//!
//! ```text
//! <?xml version="1.0"?>\r\n
//! <cdm>\r\n
//! <version>0.7</version>\r\n
//! <blockchain>Waves</blockchain>\r\n
//! <network>Testnet</network>\r\n
//! <operations>\r\n
//! <create>\r\n ... \r\n</create>\r\n
//! </operations>\r\n
//! </cdm>
//! ```
//!
//! Every element starts on its own `\r\n`-separated line with no
//! indentation. Serialization is byte-stable: the same envelope always
//! renders to the same text, which is what [`CdmEnvelope::document_hash`]
//! relies on.
//!
//! Parsing is strict. Missing or duplicated elements, unknown operation tags,
//! stray text and unbalanced tags are all `MalformedEnvelope`. Child elements
//! are looked up by name, so their order inside a block does not matter; the
//! order of operations and columns does.
//!
//! Leaf text is kept byte for byte, surrounding whitespace included.
//! Whitespace between elements is ignored.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::{
    CdmEnvelope, CreateTable, EncryptedField, InsertColumn, InsertRow, Operation, Origin,
    OriginSignature,
};
use crate::crypto::PublicKey;
use crate::error::{Error, Result};

/// First line of every document
pub const XML_DECLARATION: &str = "<?xml version=\"1.0\"?>";

/// Line separator between elements
pub const LINE_SEPARATOR: &str = "\r\n";

// ============================================================================
// SERIALIZATION
// ============================================================================

/// Render an envelope as wire text
pub fn serialize(envelope: &CdmEnvelope) -> String {
    let mut w = WireWriter::new();

    w.open("cdm");
    w.leaf("version", envelope.version());
    w.leaf("blockchain", envelope.blockchain());
    w.leaf("network", envelope.network());
    w.open("operations");
    for operation in envelope.operations() {
        write_operation(&mut w, operation);
    }
    w.close("operations");
    w.close("cdm");

    w.finish()
}

fn write_operation(w: &mut WireWriter, operation: &Operation) {
    let tag = operation.tag();
    w.open(tag);
    w.field("table", operation.table());

    w.open("columns");
    match operation {
        Operation::CreateTable(op) => {
            for column in &op.columns {
                w.field("column", column);
            }
        }
        Operation::InsertRow(op) => {
            for cell in &op.columns {
                w.open("column");
                w.leaf("ciphertext", &cell.column.ciphertext);
                w.leaf("sha256", &cell.column.digest);
                w.field("value", &cell.value);
                w.close("column");
            }
        }
    }
    w.close("columns");

    let origin = operation.origin();
    w.open("origin");
    w.leaf("publickey", &origin.public_key.to_base58());
    w.leaf("signature", &origin.signature.to_wire());
    w.close("origin");

    w.open("recipient");
    w.leaf("publickey", &operation.recipient().to_base58());
    w.close("recipient");

    w.close(tag);
}

struct WireWriter {
    out: String,
}

impl WireWriter {
    fn new() -> Self {
        Self {
            out: XML_DECLARATION.to_string(),
        }
    }

    fn open(&mut self, tag: &str) {
        self.out.push_str(LINE_SEPARATOR);
        self.out.push('<');
        self.out.push_str(tag);
        self.out.push('>');
    }

    fn close(&mut self, tag: &str) {
        self.out.push_str(LINE_SEPARATOR);
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
    }

    fn leaf(&mut self, tag: &str, text: &str) {
        self.open(tag);
        self.out.push_str(&escape(text));
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
    }

    fn field(&mut self, tag: &str, field: &EncryptedField) {
        self.open(tag);
        self.leaf("ciphertext", &field.ciphertext);
        self.leaf("sha256", &field.digest);
        self.close(tag);
    }

    fn finish(self) -> String {
        self.out
    }
}

// ============================================================================
// PARSING
// ============================================================================

/// Parse wire text into an envelope
///
/// The version is not checked here; call
/// [`CdmEnvelope::ensure_version`] on the result.
pub fn parse(text: &str) -> Result<CdmEnvelope> {
    let root = read_tree(text)?;
    if root.name != "cdm" {
        return Err(malformed(format!("Expected <cdm> root, found <{}>", root.name)));
    }
    root.expect_children(&["version", "blockchain", "network", "operations"])?;

    let operations = root
        .child("operations")?
        .container()?
        .children
        .iter()
        .map(read_operation)
        .collect::<Result<Vec<_>>>()?;

    Ok(CdmEnvelope::new(
        root.leaf_text("version")?,
        root.leaf_text("blockchain")?,
        &root.leaf_text("network")?,
        operations,
    ))
}

fn read_operation(element: &Element) -> Result<Operation> {
    element.expect_children(&["table", "columns", "origin", "recipient"])?;

    let table = read_field(element.child("table")?)?;
    let columns = element.child("columns")?.container()?;
    columns.expect_children(&["column"])?;
    let origin = read_origin(element.child("origin")?)?;
    let recipient = read_recipient(element.child("recipient")?)?;

    match element.name.as_str() {
        "create" => Ok(Operation::CreateTable(CreateTable {
            table,
            columns: columns
                .children
                .iter()
                .map(read_field)
                .collect::<Result<Vec<_>>>()?,
            origin,
            recipient,
        })),
        "insert" => Ok(Operation::InsertRow(InsertRow {
            table,
            columns: columns
                .children
                .iter()
                .map(read_cell)
                .collect::<Result<Vec<_>>>()?,
            origin,
            recipient,
        })),
        other => Err(malformed(format!("Unknown operation <{}>", other))),
    }
}

fn read_field(element: &Element) -> Result<EncryptedField> {
    element.expect_children(&["ciphertext", "sha256"])?;
    Ok(EncryptedField::new(
        element.leaf_text("ciphertext")?,
        element.leaf_text("sha256")?,
    ))
}

fn read_cell(element: &Element) -> Result<InsertColumn> {
    element.expect_children(&["ciphertext", "sha256", "value"])?;
    Ok(InsertColumn {
        column: EncryptedField::new(
            element.leaf_text("ciphertext")?,
            element.leaf_text("sha256")?,
        ),
        value: read_field(element.child("value")?)?,
    })
}

fn read_origin(element: &Element) -> Result<Origin> {
    element.expect_children(&["publickey", "signature"])?;
    Ok(Origin {
        public_key: read_public_key(element)?,
        signature: OriginSignature::from_wire(&element.leaf_text("signature")?)?,
    })
}

fn read_recipient(element: &Element) -> Result<PublicKey> {
    element.expect_children(&["publickey"])?;
    read_public_key(element)
}

fn read_public_key(element: &Element) -> Result<PublicKey> {
    let text = element.leaf_text("publickey")?;
    PublicKey::from_base58(&text)
        .map_err(|e| malformed(format!("Bad public key in <{}>: {}", element.name, e)))
}

fn malformed(message: impl Into<String>) -> Error {
    Error::MalformedEnvelope(message.into())
}

// ============================================================================
// ELEMENT TREE
// ============================================================================

#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn named(name: &[u8]) -> Result<Self> {
        let name = std::str::from_utf8(name)
            .map_err(|_| malformed("Element name is not UTF-8"))?
            .to_string();
        Ok(Self {
            name,
            ..Self::default()
        })
    }

    /// The single child called `name`
    fn child(&self, name: &str) -> Result<&Element> {
        let mut matches = self.children.iter().filter(|c| c.name == name);
        match (matches.next(), matches.next()) {
            (Some(child), None) => Ok(child),
            (None, _) => Err(malformed(format!("<{}> is missing <{}>", self.name, name))),
            (Some(_), Some(_)) => Err(malformed(format!(
                "<{}> has more than one <{}>",
                self.name, name
            ))),
        }
    }

    /// Text of the single child called `name`, which must not nest further
    fn leaf_text(&self, name: &str) -> Result<String> {
        let child = self.child(name)?;
        if !child.children.is_empty() {
            return Err(malformed(format!("<{}> must contain only text", name)));
        }
        Ok(child.text.clone())
    }

    fn container(&self) -> Result<&Element> {
        if is_blank(&self.text) {
            Ok(self)
        } else {
            Err(malformed(format!("Unexpected text inside <{}>", self.name)))
        }
    }

    /// Reject text and any child not in `allowed`
    fn expect_children(&self, allowed: &[&str]) -> Result<()> {
        self.container()?;
        match self
            .children
            .iter()
            .find(|c| !allowed.contains(&c.name.as_str()))
        {
            Some(stray) => Err(malformed(format!(
                "Unexpected <{}> inside <{}>",
                stray.name, self.name
            ))),
            None => Ok(()),
        }
    }
}

fn read_tree(text: &str) -> Result<Element> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if root.is_some() {
                    return Err(malformed("Content after the root element"));
                }
                stack.push(Element::named(e.name().as_ref())?);
            }
            Event::Empty(e) => {
                let element = Element::named(e.name().as_ref())?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed("Closing tag without an opening tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                match stack.last_mut() {
                    Some(parent) => parent.text.push_str(&text),
                    None if is_blank(&text) => {}
                    None => return Err(malformed("Text outside the root element")),
                }
            }
            Event::CData(c) => {
                let text = std::str::from_utf8(&c)
                    .map_err(|_| malformed("CDATA is not UTF-8"))?;
                let parent = stack
                    .last_mut()
                    .ok_or_else(|| malformed("CDATA outside the root element"))?;
                parent.text.push_str(text);
            }
            Event::Eof => break,
            // Declaration, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(malformed(format!("Unclosed <{}>", open.name)));
    }
    root.ok_or_else(|| malformed("Empty document"))
}

fn is_blank(text: &str) -> bool {
    text.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(malformed("More than one root element")),
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{sha256_hex, KeyPair};
    use pretty_assertions::assert_eq;

    fn key(seed: &str) -> PublicKey {
        KeyPair::from_seed(seed).unwrap().public_key()
    }

    fn field(ciphertext: &str, plain: &str) -> EncryptedField {
        EncryptedField::new(ciphertext, sha256_hex(plain.as_bytes()))
    }

    fn sample() -> CdmEnvelope {
        let origin = Origin {
            public_key: key("root"),
            signature: OriginSignature::Placeholder,
        };
        CdmEnvelope::new(
            "0.7",
            "Waves",
            "testnet",
            vec![
                Operation::CreateTable(CreateTable {
                    table: field("T1", "t"),
                    columns: vec![field("C1", "a"), field("C2", "b")],
                    origin: origin.clone(),
                    recipient: key("client"),
                }),
                Operation::InsertRow(InsertRow {
                    table: field("T1", "t"),
                    columns: vec![InsertColumn {
                        column: field("C1", "a"),
                        value: field("V1", "1"),
                    }],
                    origin,
                    recipient: key("client"),
                }),
            ],
        )
    }

    #[test]
    fn test_serialize_exact_layout() {
        let envelope = CdmEnvelope::new("0.7", "Waves", "TESTNET", vec![]);
        assert_eq!(
            serialize(&envelope),
            "<?xml version=\"1.0\"?>\r\n<cdm>\r\n<version>0.7</version>\r\n\
             <blockchain>Waves</blockchain>\r\n<network>Testnet</network>\r\n\
             <operations>\r\n</operations>\r\n</cdm>"
        );
    }

    #[test]
    fn test_serialize_create_block() {
        let text = serialize(&sample());
        let expected_create = format!(
            "\r\n<create>\r\n<table>\r\n<ciphertext>T1</ciphertext>\r\n<sha256>{}</sha256>\r\n</table>\
             \r\n<columns>\r\n<column>\r\n<ciphertext>C1</ciphertext>\r\n<sha256>{}</sha256>\r\n</column>\
             \r\n<column>\r\n<ciphertext>C2</ciphertext>\r\n<sha256>{}</sha256>\r\n</column>\r\n</columns>\
             \r\n<origin>\r\n<publickey>{}</publickey>\r\n<signature>signature</signature>\r\n</origin>\
             \r\n<recipient>\r\n<publickey>{}</publickey>\r\n</recipient>\r\n</create>",
            sha256_hex(b"t"),
            sha256_hex(b"a"),
            sha256_hex(b"b"),
            key("root"),
            key("client"),
        );
        assert!(text.contains(&expected_create));
        assert!(text.contains("\r\n<column>\r\n<ciphertext>C1</ciphertext>"));
        assert!(text.contains("\r\n<value>\r\n<ciphertext>V1</ciphertext>"));
    }

    #[test]
    fn test_serialize_is_stable() {
        assert_eq!(serialize(&sample()), serialize(&sample()));
    }

    #[test]
    fn test_parse_round_trip() {
        let envelope = sample();
        assert_eq!(parse(&serialize(&envelope)).unwrap(), envelope);
    }

    #[test]
    fn test_parse_escaped_text() {
        let envelope = CdmEnvelope::new("0.7 <beta> & co", "Waves", "testnet", vec![]);
        let text = serialize(&envelope);
        assert!(text.contains("0.7 &lt;beta&gt; &amp; co"));
        assert_eq!(parse(&text).unwrap().version(), "0.7 <beta> & co");
    }

    #[test]
    fn test_parse_keeps_leaf_whitespace() {
        let envelope = CdmEnvelope::new(" 0.7 ", "\tWaves  ", "testnet", vec![]);
        let text = serialize(&envelope);
        let parsed = parse(&text).unwrap();

        assert_eq!(parsed.version(), " 0.7 ");
        assert_eq!(parsed.blockchain(), "\tWaves  ");
        assert_eq!(parsed, envelope);
        assert_eq!(parsed.document_hash(), envelope.document_hash());
    }

    #[test]
    fn test_parse_keeps_blank_leaf() {
        let envelope = CdmEnvelope::new("  ", "", "testnet", vec![]);
        assert_eq!(parse(&serialize(&envelope)).unwrap(), envelope);
    }

    #[test]
    fn test_parse_normalizes_network() {
        let text = serialize(&sample()).replace("Testnet", "TESTNET");
        assert_eq!(parse(&text).unwrap().network(), "Testnet");
    }

    #[test]
    fn test_parse_tolerates_indentation() {
        let text = serialize(&sample()).replace("\r\n", "\n    ");
        assert_eq!(parse(&text).unwrap(), sample());
    }

    #[test]
    fn test_parse_rejects_unknown_operation() {
        let text = serialize(&sample())
            .replace("<create>", "<drop>")
            .replace("</create>", "</drop>");
        assert!(matches!(parse(&text), Err(Error::MalformedEnvelope(_))));
    }

    #[test]
    fn test_parse_rejects_missing_recipient() {
        let envelope = CdmEnvelope::new("0.7", "Waves", "testnet", vec![]);
        let text = serialize(&envelope).replace("<network>Testnet</network>", "");
        assert!(matches!(parse(&text), Err(Error::MalformedEnvelope(_))));

        let text = serialize(&sample());
        let start = text.find("<recipient>").unwrap();
        let end = text.find("</recipient>").unwrap() + "</recipient>".len();
        let broken = format!("{}{}", &text[..start], &text[end..]);
        assert!(matches!(parse(&broken), Err(Error::MalformedEnvelope(_))));
    }

    #[test]
    fn test_parse_rejects_unbalanced() {
        let text = serialize(&sample()).replace("</operations>", "");
        assert!(matches!(parse(&text), Err(Error::MalformedEnvelope(_))));
    }

    #[test]
    fn test_parse_rejects_stray_text() {
        let text = serialize(&sample()).replace("<operations>", "<operations>junk");
        assert!(matches!(parse(&text), Err(Error::MalformedEnvelope(_))));
    }

    #[test]
    fn test_parse_rejects_bad_public_key() {
        let text = serialize(&sample()).replacen(&key("client").to_base58(), "not-a-key", 1);
        assert!(matches!(parse(&text), Err(Error::MalformedEnvelope(_))));
    }

    #[test]
    fn test_parse_rejects_wrong_root() {
        assert!(matches!(parse("<doc></doc>"), Err(Error::MalformedEnvelope(_))));
        assert!(matches!(parse(""), Err(Error::MalformedEnvelope(_))));
    }
}
