//! Dialog for reporting a post or a user.

use std::sync::{Arc, Mutex};

use metalhead_shared::constants::{MAX_REPORT_DETAILS_LENGTH, REPORT_REASONS};
use metalhead_shared::validation::build_report_reason;
use metalhead_shared::{PostId, Principal};

use super::{lock, toast_failure, Pending};
use crate::error::Result;
use crate::state::AppState;

pub const DESCRIPTION: &str =
    "Help us maintain a safe community by reporting inappropriate content.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFields {
    pub open: bool,
    pub reason: String,
    pub details: String,
}

#[derive(Clone)]
pub struct ReportDialog {
    state: AppState,
    reported_user: Option<Principal>,
    reported_post: Option<PostId>,
    fields: Arc<Mutex<ReportFields>>,
    pending: Pending,
}

impl ReportDialog {
    pub fn new(
        state: AppState,
        reported_user: Option<Principal>,
        reported_post: Option<PostId>,
    ) -> Self {
        Self {
            state,
            reported_user,
            reported_post,
            fields: Arc::new(Mutex::new(ReportFields::default())),
            pending: Pending::default(),
        }
    }

    pub fn reasons(&self) -> &'static [&'static str] {
        &REPORT_REASONS
    }

    pub fn fields(&self) -> ReportFields {
        lock(&self.fields).clone()
    }

    pub fn is_open(&self) -> bool {
        lock(&self.fields).open
    }

    /// Open or close the dialog. Closing resets the form unless a
    /// submission is still running.
    pub fn set_open(&self, open: bool) {
        let pending = self.pending.is_pending();
        let mut fields = lock(&self.fields);
        if !open && !pending {
            fields.reason.clear();
            fields.details.clear();
        }
        fields.open = open;
    }

    pub fn set_reason(&self, reason: impl Into<String>) {
        lock(&self.fields).reason = reason.into();
    }

    pub fn set_details(&self, details: impl Into<String>) {
        lock(&self.fields).details = details.into();
    }

    pub fn details_counter(&self) -> String {
        format!(
            "{} / {}",
            lock(&self.fields).details.chars().count(),
            MAX_REPORT_DETAILS_LENGTH
        )
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_pending()
    }

    pub async fn submit(&self) -> Result<()> {
        let reason = {
            let fields = lock(&self.fields);
            build_report_reason(&fields.reason, &fields.details)
        };
        let reason = match reason {
            Ok(reason) => reason,
            Err(e) => {
                self.state.notifier.error(e.to_string());
                return Err(e.into());
            }
        };

        let result = {
            let _pending = self.pending.start();
            self.state
                .data
                .report_content(self.reported_user.clone(), self.reported_post, reason)
                .await
        };

        match result {
            Ok(()) => {
                self.state
                    .notifier
                    .success("Report submitted. Thank you for helping keep the community safe.");
                self.set_open(false);
                Ok(())
            }
            Err(err) => {
                toast_failure(&self.state.notifier, &err, "Failed to submit report");
                Err(err)
            }
        }
    }
}
