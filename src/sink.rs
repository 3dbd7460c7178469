use std::{
    fs::{self, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::{config::SourceKind, record::ExtractionResult, util::format_log_time};

/// Column set of the CSV log. Image-based runs log the observed `src`
/// instead of a text preview; static HTML may yield either, so it logs both.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CsvLayout {
    TextPreview,
    CurrentSrc,
    Combined,
}

impl CsvLayout {
    pub const fn for_source(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Ocr => Self::TextPreview,
            SourceKind::Dom => Self::CurrentSrc,
            SourceKind::Html => Self::Combined,
        }
    }

    pub const fn header(self) -> &'static [&'static str] {
        match self {
            Self::TextPreview => &["timestamp", "is_valid", "matched_level", "status_text", "text_preview"],
            Self::CurrentSrc => &["timestamp", "is_valid", "matched_level", "status_text", "current_src", "error"],
            Self::Combined => &[
                "timestamp",
                "is_valid",
                "matched_level",
                "status_text",
                "text_preview",
                "current_src",
                "error",
            ],
        }
    }

    fn row(self, r: &ExtractionResult) -> Vec<String> {
        let mut row = vec![
            format_log_time(&r.timestamp),
            r.is_valid.to_string(),
            r.matched_level.to_string(),
            r.status_text.to_string(),
        ];
        match self {
            Self::TextPreview => row.push(r.text_preview.clone()),
            Self::CurrentSrc => {
                row.push(r.current_src.clone().unwrap_or_default());
                row.push(r.error.clone().unwrap_or_default());
            }
            Self::Combined => {
                row.push(r.text_preview.clone());
                row.push(r.current_src.clone().unwrap_or_default());
                row.push(r.error.clone().unwrap_or_default());
            }
        }
        row
    }
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

pub fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        let cell = cell.as_ref();
        if first {
            first = false;
        } else {
            w.write_all(b",")?;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\n")
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

/// Append-only run log. The header goes in once, when the file is created.
pub struct CsvLog {
    path: PathBuf,
    layout: CsvLayout,
}

impl CsvLog {
    pub const fn new(path: PathBuf, layout: CsvLayout) -> Self {
        Self { path, layout }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, result: &ExtractionResult) -> io::Result<()> {
        ensure_parent(&self.path)?;

        let file_exists = self.path.is_file();
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut w = BufWriter::new(file);

        if !file_exists {
            write_row(&mut w, self.layout.header())?;
        }
        write_row(&mut w, self.layout.row(result).as_slice())?;
        w.flush()?;

        tracing::info!(target: "sink", "results saved to {}", self.path.display());
        Ok(())
    }
}

/// Latest result only, rewritten every run.
pub struct JsonSnapshot {
    path: PathBuf,
}

impl JsonSnapshot {
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Written to a sibling temp file and renamed over the old snapshot, so
    /// readers never see a half-written file.
    pub fn write(&self, result: &ExtractionResult) -> io::Result<()> {
        ensure_parent(&self.path)?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut w = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut w, result)?;
            w.write_all(b"\n")?;
            w.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        tracing::info!(target: "sink", "snapshot written to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classify::Classification,
        level::OccupancyLevel,
        source::Signal,
        util::jst_now,
    };

    fn sample() -> ExtractionResult {
        ExtractionResult::classified(
            &Signal::Text("空いてます, \"today\"".to_owned()),
            Classification::tier(OccupancyLevel::Lv1),
            jst_now(),
        )
    }

    #[test]
    fn quotes_only_when_needed() {
        let mut buf = Vec::new();
        write_row(&mut buf, ["a", "b,c", "say \"hi\"", "x\ny"].as_slice()).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "a,\"b,c\",\"say \"\"hi\"\"\",\"x\ny\"\n");
    }

    #[test]
    fn header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvLog::new(dir.path().join("results/monitor_log.csv"), CsvLayout::TextPreview);

        log.append(&sample()).unwrap();
        log.append(&sample()).unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        let lines = content.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "timestamp,is_valid,matched_level,status_text,text_preview");
        assert!(lines[1].contains(",true,Lv1,空いてます,\"空いてます, \"\"today\"\"\""));
    }

    #[test]
    fn src_layout_columns() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvLog::new(dir.path().join("log.csv"), CsvLayout::for_source(SourceKind::Dom));
        let r = ExtractionResult::all_retries_failed(Some("timed out".to_owned()), jst_now());

        log.append(&r).unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("timestamp,is_valid,matched_level,status_text,current_src,error"));
        assert!(lines.next().unwrap().ends_with(",false,AllRetriesFailed,全てのリトライが失敗しました,,timed out"));
    }

    #[test]
    fn snapshot_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let snap = JsonSnapshot::new(dir.path().join("latest.json"));

        snap.write(&ExtractionResult::all_retries_failed(None, jst_now())).unwrap();
        snap.write(&sample()).unwrap();

        let read: ExtractionResult =
            serde_json::from_str(&fs::read_to_string(dir.path().join("latest.json")).unwrap()).unwrap();
        assert_eq!(read.matched_level, OccupancyLevel::Lv1);
        assert!(read.is_valid);
        // no temp files left next to the snapshot
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn html_layout_keeps_src_and_preview() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvLog::new(dir.path().join("log.csv"), CsvLayout::for_source(SourceKind::Html));
        let img = ExtractionResult::unclassified(&Signal::ImageSrc("/image/Lv9-image.png".to_owned()), jst_now());
        let text = ExtractionResult::classified(
            &Signal::Text("やや混雑しています".to_owned()),
            Classification::tier(OccupancyLevel::Lv2),
            jst_now(),
        );

        log.append(&img).unwrap();
        log.append(&text).unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        let lines = content.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "timestamp,is_valid,matched_level,status_text,text_preview,current_src,error");
        assert!(lines[1].ends_with(",false,Unknown,判定できませんでした,,/image/Lv9-image.png,"));
        assert!(lines[2].ends_with(",true,Lv2,やや混雑しています,やや混雑しています,,"));
    }
}
