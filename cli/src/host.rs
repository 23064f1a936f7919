//! A presentation host backed by a folder of exported slide images.
//!
//! Slides are the `.png`/`.jpg` files of the folder in file name order.
//! Notes for `slide03.png` live in `slide03.txt` next to it.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use deckremote_core::{Error, PresentationHost, Result};

const SLIDE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub struct SlideFolder {
    slides: Vec<PathBuf>,
    /// Index of the slide on screen, `None` while no show runs
    current: Mutex<Option<usize>>,
}

impl SlideFolder {
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("failed to read slides folder {}", dir.display()))?;

        let mut slides = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && is_slide(&path) {
                slides.push(path);
            }
        }
        slides.sort();

        anyhow::ensure!(!slides.is_empty(), "no slide images in {}", dir.display());
        tracing::info!("loaded {} slides from {}", slides.len(), dir.display());

        Ok(Self {
            slides,
            current: Mutex::new(None),
        })
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    /// Zero-based index of the slide on screen
    pub fn current(&self) -> Option<usize> {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<usize>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn step(&self, forward: bool) -> Result<()> {
        let mut current = self.lock();
        let index = current.ok_or_else(|| Error::Host("no slide show running".to_string()))?;
        let next = if forward {
            (index + 1).min(self.slides.len() - 1)
        } else {
            index.saturating_sub(1)
        };
        *current = Some(next);
        tracing::debug!("slide {}/{}", next + 1, self.slides.len());
        Ok(())
    }

    fn current_path(&self) -> Option<&Path> {
        self.current().and_then(|i| self.slides.get(i)).map(PathBuf::as_path)
    }
}

fn is_slide(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SLIDE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl PresentationHost for SlideFolder {
    fn start_slide_show(&self) -> Result<()> {
        *self.lock() = Some(0);
        tracing::info!("slide show started");
        Ok(())
    }

    fn stop_slide_show(&self) -> Result<()> {
        *self.lock() = None;
        tracing::info!("slide show stopped");
        Ok(())
    }

    fn next_slide(&self) -> Result<()> {
        self.step(true)
    }

    fn previous_slide(&self) -> Result<()> {
        self.step(false)
    }

    fn slide_notes(&self) -> Result<Option<String>> {
        let Some(slide) = self.current_path() else {
            return Ok(None);
        };
        let notes = slide.with_extension("txt");
        if !notes.is_file() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(notes)?))
    }

    fn slide_image(&self) -> Result<Option<Vec<u8>>> {
        match self.current_path() {
            Some(slide) => Ok(Some(std::fs::read(slide)?)),
            None => Ok(None),
        }
    }
}
