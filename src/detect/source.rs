use anyhow::{Context, Result};
use std::io::BufRead;

use super::result::PredictionFrame;

/// Reads newline-delimited prediction frames (one JSON document per line).
///
/// Blank lines are skipped. A line that fails to parse yields an `Err` for
/// that frame only; iteration continues with the next line.
pub struct PredictionLines<R> {
    reader: R,
    line: String,
    line_no: u64,
}

impl<R: BufRead> PredictionLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for PredictionLines<R> {
    type Item = Result<PredictionFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    return Some(Err(anyhow::Error::new(e).context("read prediction stream")))
                }
            }
            self.line_no += 1;
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Some(
                PredictionFrame::parse(trimmed.as_bytes())
                    .with_context(|| format!("line {}", self.line_no)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn yields_one_frame_per_line() {
        let input = "{\"predictions\":{\"class_name\":[\"stop\"],\"confidence\":[0.8]}}\n\n{}\nnope\n";
        let frames: Vec<_> = PredictionLines::new(Cursor::new(input)).collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].as_ref().unwrap().detections()[0].label, "stop");
        assert!(frames[1].as_ref().unwrap().detections().is_empty());
        let err = frames[2].as_ref().unwrap_err();
        assert!(format!("{:#}", err).contains("line 4"));
    }
}
