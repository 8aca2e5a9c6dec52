use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Text accepted from the input box, with the handle that can abort the
/// request it starts.
#[derive(Debug)]
pub struct Submission {
    pub text: String,
    pub cancel: CancellationToken,
}

/// Draft text plus the cancellation handle of the last request it started.
#[derive(Debug, Default)]
pub struct InputControl {
    draft: String,
    handle: Option<CancellationToken>,
}

impl InputControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn can_submit(&self, is_streaming: bool) -> bool {
        !is_streaming && !self.draft.trim().is_empty()
    }

    // The box is disabled while a response streams.
    pub fn push(&mut self, c: char, is_streaming: bool) {
        if !is_streaming {
            self.draft.push(c);
        }
    }

    pub fn backspace(&mut self, is_streaming: bool) {
        if !is_streaming {
            self.draft.pop();
        }
    }

    pub fn submit(&mut self, is_streaming: bool) -> Option<Submission> {
        if !self.can_submit(is_streaming) {
            return None;
        }
        let cancel = CancellationToken::new();
        self.handle = Some(cancel.clone());
        let text = self.draft.trim().to_string();
        self.draft.clear();
        Some(Submission { text, cancel })
    }

    /// Aborts the outstanding request. Returns `false` when there was
    /// nothing to abort.
    pub fn stop(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) if !handle.is_cancelled() => {
                debug!("Aborting in-flight request");
                handle.cancel();
                true
            }
            _ => false,
        }
    }

    /// Forgets the handle once its request has settled; there is nothing
    /// left for it to abort.
    pub fn settle(&mut self) {
        self.handle = None;
    }
}

impl Drop for InputControl {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> InputControl {
        let mut input = InputControl::new();
        for c in text.chars() {
            input.push(c, false);
        }
        input
    }

    #[test]
    fn submit_trims_and_clears_draft() {
        let mut input = typed("  hello  ");
        let submission = input.submit(false).unwrap();
        assert_eq!(submission.text, "hello");
        assert!(!submission.cancel.is_cancelled());
        assert_eq!(input.draft(), "");
    }

    #[test]
    fn blank_draft_is_not_submitted() {
        let mut input = typed("   ");
        assert!(input.submit(false).is_none());
        assert_eq!(input.draft(), "   ");
    }

    #[test]
    fn submit_rejected_while_streaming() {
        let mut input = typed("hello");
        assert!(input.submit(true).is_none());
        assert_eq!(input.draft(), "hello");
    }

    #[test]
    fn editing_is_disabled_while_streaming() {
        let mut input = typed("ab");
        input.push('c', true);
        input.backspace(true);
        assert_eq!(input.draft(), "ab");
        input.backspace(false);
        assert_eq!(input.draft(), "a");
    }

    #[test]
    fn stop_cancels_outstanding_handle() {
        let mut input = typed("hello");
        let submission = input.submit(false).unwrap();
        assert!(input.stop());
        assert!(submission.cancel.is_cancelled());
        assert!(!input.stop());
    }

    #[test]
    fn stop_after_settle_is_noop() {
        let mut input = typed("hello");
        let submission = input.submit(false).unwrap();
        input.settle();
        assert!(!input.stop());
        assert!(!submission.cancel.is_cancelled());
    }

    #[test]
    fn stop_without_request_is_noop() {
        let mut input = InputControl::new();
        assert!(!input.stop());
    }

    #[test]
    fn drop_cancels_outstanding_handle() {
        let mut input = typed("hello");
        let submission = input.submit(false).unwrap();
        drop(input);
        assert!(submission.cancel.is_cancelled());
    }
}
