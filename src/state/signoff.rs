/// Sign-off state machine
///
/// Decides which screen is shown and which mutations are allowed.
/// `Error`, `Expired` and `Signed` are terminal for the session; a fresh
/// launch re-runs the resolver from scratch.

use crate::resolver::Resolution;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignOffState {
    #[default]
    Loading,
    Viewing,
    Signing,
    Signed,
    Error,
    Expired,
}

impl SignOffState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SignOffState::Signed | SignOffState::Error | SignOffState::Expired
        )
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOffEvent {
    /// Outcome of the share lookup
    Resolved(ResolvedAs),
    BeginSigning,
    CancelSigning,
    SubmitStarted,
    SubmitFailed,
    SubmitSucceeded,
}

/// Resolution outcome without the record itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedAs {
    NotFound,
    Signed,
    Expired,
    Viewable { requires_signature: bool },
}

impl From<&Resolution> for ResolvedAs {
    fn from(resolution: &Resolution) -> Self {
        match resolution {
            Resolution::NotFound => ResolvedAs::NotFound,
            Resolution::Signed(_) => ResolvedAs::Signed,
            Resolution::Expired(_) => ResolvedAs::Expired,
            Resolution::Viewable(share) => ResolvedAs::Viewable {
                requires_signature: share.requires_signature,
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignOff {
    state: SignOffState,
    requires_signature: bool,
    submitting: bool,
}

impl SignOff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SignOffState {
        self.state
    }

    pub fn requires_signature(&self) -> bool {
        self.requires_signature
    }

    /// True while the sign-off write is in flight
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Feed an event. Returns true when the visible state changed.
    /// Events that are not valid in the current state are ignored.
    pub fn apply(&mut self, event: SignOffEvent) -> bool {
        use SignOffState::*;

        if self.state.is_terminal() {
            return false;
        }

        let next = match (self.state, event) {
            (Loading, SignOffEvent::Resolved(resolved)) => match resolved {
                ResolvedAs::NotFound => Error,
                ResolvedAs::Signed => Signed,
                ResolvedAs::Expired => Expired,
                ResolvedAs::Viewable { requires_signature } => {
                    self.requires_signature = requires_signature;
                    Viewing
                }
            },
            (Viewing, SignOffEvent::BeginSigning) if self.requires_signature => Signing,
            (Signing, SignOffEvent::CancelSigning) if !self.submitting => Viewing,
            (Signing, SignOffEvent::SubmitStarted) => {
                self.submitting = true;
                return false;
            }
            (Signing, SignOffEvent::SubmitFailed) => {
                self.submitting = false;
                return false;
            }
            (Signing, SignOffEvent::SubmitSucceeded) if self.submitting => {
                self.submitting = false;
                Signed
            }
            _ => return false,
        };

        let changed = next != self.state;
        self.state = next;
        changed
    }

    /// Whether the submit control is enabled
    pub fn can_submit(&self, signer_name: &str, has_content: bool) -> bool {
        self.state == SignOffState::Signing
            && !self.submitting
            && crate::signature::can_submit(signer_name, has_content)
    }
}
