//! Progress reporting using indicatif.

use std::sync::Mutex;

use fontflash_core::events::{FlashEvent, FlashObserver, TracingObserver};
use indicatif::{ProgressBar, ProgressStyle};

/// Shows block progress as a bar and forwards everything else to tracing.
pub struct IndicatifObserver {
    bar: Mutex<Option<ProgressBar>>,
}

impl IndicatifObserver {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn create_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }
}

impl FlashObserver for IndicatifObserver {
    fn on_event(&self, event: &FlashEvent) {
        let Ok(mut bar) = self.bar.lock() else {
            return;
        };

        match event {
            FlashEvent::Progress {
                bytes_sent,
                total_bytes,
                ..
            } => {
                let pb = bar.get_or_insert_with(|| Self::create_bar(*total_bytes as u64));
                pb.set_position(*bytes_sent as u64);
            }
            FlashEvent::DeviceMessage { line } => match bar.as_ref() {
                Some(pb) => pb.println(format!("MCU: {}", line)),
                None => println!("MCU: {}", line),
            },
            FlashEvent::Complete => {
                if let Some(pb) = bar.take() {
                    pb.finish();
                }
                println!("MCU: Font programming completed!");
            }
            FlashEvent::Error { .. } => {
                if let Some(pb) = bar.take() {
                    pb.abandon();
                }
                TracingObserver.on_event(event);
            }
            _ => match bar.as_ref() {
                Some(pb) => pb.suspend(|| TracingObserver.on_event(event)),
                None => TracingObserver.on_event(event),
            },
        }
    }
}

impl Default for IndicatifObserver {
    fn default() -> Self {
        Self::new()
    }
}
