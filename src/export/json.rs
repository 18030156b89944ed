use super::ExportError;
use std::io::Write;

/// Write any serializable view as pretty-printed JSON, followed by a newline
pub fn write_json<T, W>(data: &T, mut writer: W) -> Result<(), ExportError>
where
    T: serde::Serialize + ?Sized,
    W: Write,
{
    serde_json::to_writer_pretty(&mut writer, data)
        .map_err(|e| ExportError::Serialization(e.to_string()))?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::ActivityStats;
    use rust_decimal_macros::dec;

    #[test]
    fn test_write_stats() {
        let stats = ActivityStats {
            distance: dec!(42.5),
            days: 3,
            avg_pace: "5'30\"/km".to_string(),
            routes: 2,
            runs: 4,
        };

        let mut buffer = Vec::new();
        write_json(&stats, &mut buffer).unwrap();
        let content = String::from_utf8(buffer).unwrap();

        assert!(content.contains("\"distance\": \"42.5\""));
        assert!(content.contains("\"days\": 3"));
        assert!(content.contains("\"avg_pace\": \"5'30\\\"/km\""));
        assert!(content.ends_with("}\n"));
    }
}
