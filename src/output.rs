//! The description-file sink.
//!
//! One shared text stream for the whole run. Each image contributes a
//! record: its path on one line, then one line per committed rectangle.
//! Records are flushed as they are written so earlier images survive a
//! fatal error later in the run; the file handle is released on drop.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{RunError, RunResult};
use crate::geometry::Rect;

#[derive(Debug)]
pub struct DescriptionSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl DescriptionSink {
    /// Opens the sink, truncating when `rewrite` is set and appending
    /// otherwise.
    pub fn open(path: &Path, rewrite: bool) -> RunResult<Self> {
        let mut options = OpenOptions::new();
        options.create(true);
        if rewrite {
            options.write(true).truncate(true);
        } else {
            options.append(true);
        }
        let file = options.open(path).map_err(|source| RunError::Description {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn write_record(&mut self, image: &Path, rects: &[Rect]) -> RunResult<()> {
        self.try_write(image, rects)
            .map_err(|source| RunError::Description {
                path: self.path.clone(),
                source,
            })
    }

    fn try_write(&mut self, image: &Path, rects: &[Rect]) -> std::io::Result<()> {
        writeln!(self.writer, "{}", image.display())?;
        for rect in rects {
            writeln!(self.writer, "{rect}")?;
        }
        self.writer.flush()
    }
}
