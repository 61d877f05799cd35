//! Display surfaces
//!
//! A surface is the external, mutable UI a frame is drawn onto. The refresh
//! guard is the only caller; implementations just draw and report failure.

use crate::error::SurfaceError;
use crate::frame::ProgressFrame;
use async_trait::async_trait;
use frameguard_core::TaskId;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

/// Mutable display the guard protects
#[async_trait]
pub trait DisplaySurface: Send + Sync {
    /// Draw one progress frame
    async fn render(&self, frame: &ProgressFrame) -> Result<(), SurfaceError>;

    /// Tell the user no progress is available for `task_id`
    async fn show_unavailable(&self, task_id: &TaskId) -> Result<(), SurfaceError>;

    /// Tell the user auto-refresh stopped after `after`
    async fn show_timed_out(&self, _task_id: &TaskId, _after: Duration) -> Result<(), SurfaceError> {
        Ok(())
    }
}

#[async_trait]
impl<D: DisplaySurface + ?Sized> DisplaySurface for Arc<D> {
    async fn render(&self, frame: &ProgressFrame) -> Result<(), SurfaceError> {
        (**self).render(frame).await
    }

    async fn show_unavailable(&self, task_id: &TaskId) -> Result<(), SurfaceError> {
        (**self).show_unavailable(task_id).await
    }

    async fn show_timed_out(&self, task_id: &TaskId, after: Duration) -> Result<(), SurfaceError> {
        (**self).show_timed_out(task_id, after).await
    }
}

/// Plain-text surface over any writer
#[derive(Debug)]
pub struct WriterSurface<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> WriterSurface<W> {
    /// Wrap a writer
    #[must_use]
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn write_block(&self, text: &str) -> Result<(), SurfaceError> {
        let mut out = self.out.lock();
        out.write_all(text.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

impl WriterSurface<io::Stdout> {
    /// Surface on standard output
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

#[async_trait]
impl<W: Write + Send> DisplaySurface for WriterSurface<W> {
    async fn render(&self, frame: &ProgressFrame) -> Result<(), SurfaceError> {
        self.write_block(&format!(
            "[{}] {:>3}% {}\n  {}\n  {}\n",
            frame.task_id,
            frame.percent(),
            frame.status_line,
            frame.step_line,
            frame.time_line
        ))
    }

    async fn show_unavailable(&self, task_id: &TaskId) -> Result<(), SurfaceError> {
        self.write_block(&format!(
            "[{task_id}] no progress available; is the analysis running?\n"
        ))
    }

    async fn show_timed_out(&self, task_id: &TaskId, after: Duration) -> Result<(), SurfaceError> {
        self.write_block(&format!(
            "[{task_id}] auto-refresh stopped after {}s; refresh manually for the latest state\n",
            after.as_secs()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::ProgressSnapshot;
    use chrono::Utc;

    #[tokio::test]
    async fn writer_surface_renders_lines() {
        let surface = WriterSurface::new(Vec::new());
        let snap = ProgressSnapshot::new(TaskId::new("t1").unwrap())
            .with_percentage(50.0)
            .with_message("halfway");
        surface
            .render(&ProgressFrame::from_snapshot(&snap, Utc::now()))
            .await
            .unwrap();
        surface.show_unavailable(&TaskId::new("t2").unwrap()).await.unwrap();

        let text = String::from_utf8(surface.into_inner()).unwrap();
        assert!(text.starts_with("[t1]  50% [running] halfway\n"));
        assert!(text.contains("[t2] no progress available"));
    }

    #[tokio::test]
    async fn writer_surface_io_error() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let surface = WriterSurface::new(Broken);
        let err = surface
            .show_unavailable(&TaskId::new("t").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, SurfaceError::Io(_)));
        assert!(!err.is_detached());
    }
}
