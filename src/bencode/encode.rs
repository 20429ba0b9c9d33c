use super::error::BencodeError;
use super::value::Value;
use std::io::Write;

/// Encodes a bencode value to a byte vector.
///
/// Dictionary keys come out in lexicographic order because [`Value::Dict`]
/// is a `BTreeMap`, which makes the output canonical. The info hash of a
/// torrent depends on this.
///
/// # Examples
///
/// ```
/// use rlinks::bencode::{encode, Value};
///
/// let list = Value::List(vec![Value::Integer(1), Value::string("two")]);
/// assert_eq!(encode(&list).unwrap(), b"li1e3:twoe");
/// ```
pub fn encode(value: &Value) -> Result<Vec<u8>, BencodeError> {
    let mut buf = Vec::new();
    write_value(value, &mut buf)?;
    Ok(buf)
}

fn write_bytes<W: Write>(bytes: &[u8], writer: &mut W) -> Result<(), BencodeError> {
    write!(writer, "{}:", bytes.len())?;
    writer.write_all(bytes)?;
    Ok(())
}

fn write_value<W: Write>(value: &Value, writer: &mut W) -> Result<(), BencodeError> {
    match value {
        Value::Integer(i) => write!(writer, "i{}e", i)?,
        Value::Bytes(b) => write_bytes(b, writer)?,
        Value::List(items) => {
            writer.write_all(b"l")?;
            for item in items {
                write_value(item, writer)?;
            }
            writer.write_all(b"e")?;
        }
        Value::Dict(entries) => {
            writer.write_all(b"d")?;
            for (key, val) in entries {
                write_bytes(key, writer)?;
                write_value(val, writer)?;
            }
            writer.write_all(b"e")?;
        }
    }
    Ok(())
}
