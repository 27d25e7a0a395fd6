use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use pan123_upload::ProgressEvent;

const PB_STYLE: &str = "{spinner:.blue} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos}/{len} slices {msg}";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const PB_CHARS: &str = "█▓▒░  ";

static PB_TEMPLATE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    let pb_style = match ProgressStyle::with_template(PB_STYLE) {
        Ok(pb_style) => pb_style.tick_chars(TICK).progress_chars(PB_CHARS),
        Err(_) => return None,
    };

    Some(pb_style)
});

/// Slice-level progress bar driven by upload events.
///
/// Cloning shares the underlying bar, so one clone can live inside the
/// progress callback while the caller keeps another for the final message.
#[derive(Clone)]
pub struct SliceTracker {
    pub pb: ProgressBar,
}

impl Default for SliceTracker {
    fn default() -> Self { Self::new() }
}

impl SliceTracker {
    /// Create a spinner that turns into a slice bar once the first slice starts.
    pub fn new() -> Self {
        let pb = ProgressBar::new_spinner();
        if let Some(style) = PB_TEMPLATE.as_ref() {
            pb.set_style(style.clone());
        }
        pb.set_message("hashing");
        SliceTracker { pb }
    }

    /// Apply one upload transition to the bar.
    pub fn on_event(&self, event: &ProgressEvent) {
        match *event {
            ProgressEvent::UploadingSlice { seq, total } => {
                self.pb.set_length(u64::from(total));
                self.pb.set_position(u64::from(seq - 1));
                self.pb.set_message("");
            }
            ProgressEvent::RetryingSlice { seq, .. } => {
                self.pb.set_message(format!("retrying slice {seq}"));
            }
            ProgressEvent::VerifyingSlices { total } => {
                self.pb.set_position(u64::from(total));
                self.pb.set_message("verifying");
            }
            ProgressEvent::CreatingFile | ProgressEvent::ReportingCompletion => {
                self.pb.set_message(event.to_string().to_lowercase());
            }
        }
        self.pb.tick();
    }

    pub fn set_message(&self, msg: &'static str) { self.pb.set_message(msg); }

    pub fn finish(&self, msg: String) {
        if let Some(len) = self.pb.length() {
            self.pb.set_position(len);
        }
        self.pb.finish_with_message(msg);
    }

    pub fn abandon(&self) { self.pb.abandon(); }
}
