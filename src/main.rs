use chrono::{DateTime, Local, Utc};
use iced::widget::{button, canvas, column, container, image, row, scrollable, stack, text, text_input, Column};
use iced::{window, Alignment, Element, Length, Task, Theme};
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod export;
mod resolver;
mod signature;
mod state;
mod store;
mod ui;

use config::AppConfig;
use export::{ExportOutcome, HttpPhotoFetcher, PhotoFetcher};
use resolver::Resolution;
use signature::SignaturePad;
use state::data::{ShareLink, ShareStatus, SignatureRecord, SignatureSubmission};
use state::signoff::{ResolvedAs, SignOff, SignOffEvent, SignOffState};
use store::{ShareStore, SqliteShareStore};
use ui::signature::{LiveStroke, PadEvent, SignatureSurface};

/// Everything that exists only while the signing surface is shown
struct SigningSession {
    pad: SignaturePad,
    /// Finished strokes, refreshed from the pad when a stroke ends
    preview: image::Handle,
    stroke: LiveStroke,
    signer_name: String,
    /// Inline notice after a failed submit
    error: Option<String>,
    /// Encoded at submit time, kept for the confirmation screen
    pending: Option<SignatureSubmission>,
}

/// Main application state
struct PhotoSignOff {
    config: AppConfig,
    store: Option<Arc<dyn ShareStore>>,
    fetcher: Option<Arc<dyn PhotoFetcher>>,
    /// Token or share URL typed on the start screen
    link_input: String,
    resolving: bool,
    signoff: SignOff,
    share: Option<ShareLink>,
    thumbnails: HashMap<String, image::Handle>,
    signing: Option<SigningSession>,
    exporting: bool,
    /// Status line under the toolbar
    status: Option<String>,
    scale_factor: f32,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    LinkInputChanged(String),
    OpenLink,
    Resolved(Resolution),
    ScaleFactor(f32),
    PhotoLoaded(String, Option<image::Handle>),
    BeginSigning,
    CancelSigning,
    SignerNameChanged(String),
    Pad(PadEvent),
    ClearSignature,
    SubmitSignature,
    SignatureSubmitted(Result<DateTime<Utc>, String>),
    DownloadAll,
    ExportFinished(Result<ExportOutcome, String>),
}

fn raster_preview(pad: &SignaturePad) -> image::Handle {
    let raster = pad.raster();
    image::Handle::from_rgba(raster.width(), raster.height(), raster.as_raw().clone())
}

fn load_config() -> AppConfig {
    let Some(path) = AppConfig::default_path() else {
        return AppConfig::default();
    };

    let config = match AppConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "using default config");
            AppConfig::default()
        }
    };

    for problem in config.validate() {
        warn!(path = %path.display(), "config: {problem}");
    }
    config.with_defaults_for_invalid()
}

impl PhotoSignOff {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        let config = load_config();
        let timeout = config.export.request_timeout();

        let store = match store::open_store(&config.store, timeout) {
            Ok(store) => Some(store),
            Err(e) => {
                error!(error = %e, "share store unavailable");
                None
            }
        };

        let fetcher: Option<Arc<dyn PhotoFetcher>> = match HttpPhotoFetcher::new(timeout) {
            Ok(fetcher) => Some(Arc::new(fetcher)),
            Err(e) => {
                error!(error = %e, "http client unavailable");
                None
            }
        };

        let mut app = PhotoSignOff {
            config,
            store,
            fetcher,
            link_input: std::env::args().nth(1).unwrap_or_default(),
            resolving: false,
            signoff: SignOff::new(),
            share: None,
            thumbnails: HashMap::new(),
            signing: None,
            exporting: false,
            status: None,
            scale_factor: 1.0,
        };

        let scale = window::get_oldest()
            .and_then(window::get_scale_factor)
            .map(Message::ScaleFactor);

        let open = if app.link_input.trim().is_empty() {
            Task::none()
        } else {
            app.open_link()
        };

        (app, Task::batch([scale, open]))
    }

    /// Resolve whatever is in the link field. Runs at most once per launch.
    fn open_link(&mut self) -> Task<Message> {
        if self.resolving || self.signoff.state() != SignOffState::Loading {
            return Task::none();
        }

        let token = match resolver::parse_share_token(&self.link_input) {
            Ok(token) => token,
            Err(e) => {
                self.status = Some(e.to_string());
                return Task::none();
            }
        };

        let Some(store) = self.store.clone() else {
            self.signoff
                .apply(SignOffEvent::Resolved(ResolvedAs::NotFound));
            return Task::none();
        };

        self.resolving = true;
        self.status = None;
        Task::perform(
            resolver::resolve(store, token, Utc::now()),
            Message::Resolved,
        )
    }

    fn load_thumbnails(&self) -> Task<Message> {
        let (Some(share), Some(fetcher)) = (&self.share, &self.fetcher) else {
            return Task::none();
        };

        Task::batch(share.photos.iter().map(|photo| {
            let fetcher = Arc::clone(fetcher);
            let id = photo.id.clone();
            let url = photo.file_url.clone();
            Task::perform(
                async move {
                    fetcher
                        .fetch(&url)
                        .await
                        .map(image::Handle::from_bytes)
                        .ok()
                },
                move |handle| Message::PhotoLoaded(id.clone(), handle),
            )
        }))
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::LinkInputChanged(value) => {
                self.link_input = value;
                Task::none()
            }
            Message::OpenLink => self.open_link(),
            Message::Resolved(resolution) => {
                self.resolving = false;
                self.signoff
                    .apply(SignOffEvent::Resolved(ResolvedAs::from(&resolution)));
                self.share = resolution.share().cloned();

                if self.signoff.state() == SignOffState::Viewing {
                    self.load_thumbnails()
                } else {
                    Task::none()
                }
            }
            Message::ScaleFactor(scale) => {
                self.scale_factor = scale;
                Task::none()
            }
            Message::PhotoLoaded(id, handle) => {
                match handle {
                    Some(handle) => {
                        self.thumbnails.insert(id, handle);
                    }
                    None => warn!(photo = %id, "photo preview failed to load"),
                }
                Task::none()
            }
            Message::BeginSigning => {
                if self.signoff.apply(SignOffEvent::BeginSigning) {
                    let surface = &self.config.signature;
                    let pad = SignaturePad::new(
                        surface.width,
                        surface.height,
                        self.scale_factor,
                        surface.stroke_width,
                    );
                    self.signing = Some(SigningSession {
                        preview: raster_preview(&pad),
                        pad,
                        stroke: LiveStroke::new(),
                        signer_name: String::new(),
                        error: None,
                        pending: None,
                    });
                }
                Task::none()
            }
            Message::CancelSigning => {
                if self.signoff.apply(SignOffEvent::CancelSigning) {
                    self.signing = None;
                }
                Task::none()
            }
            Message::SignerNameChanged(name) => {
                if let Some(session) = &mut self.signing {
                    session.signer_name = name;
                }
                Task::none()
            }
            Message::Pad(event) => {
                let Some(session) = &mut self.signing else {
                    return Task::none();
                };
                match event {
                    PadEvent::Down { position, origin } => session.pad.pointer_down(position, origin),
                    PadEvent::Move { position, origin } => {
                        if let Some(segment) = session.pad.pointer_move(position, origin) {
                            session.stroke.push(segment);
                        }
                    }
                    PadEvent::Up => {
                        session.pad.pointer_up();
                        if !session.stroke.is_empty() {
                            session.preview = raster_preview(&session.pad);
                            session.stroke.finish();
                        }
                    }
                }
                Task::none()
            }
            Message::ClearSignature => {
                if let Some(session) = &mut self.signing {
                    session.pad.clear();
                    session.stroke.finish();
                    session.preview = raster_preview(&session.pad);
                }
                Task::none()
            }
            Message::SubmitSignature => self.submit_signature(),
            Message::SignatureSubmitted(result) => {
                let Some(session) = &mut self.signing else {
                    return Task::none();
                };
                match result {
                    Ok(signed_at) => {
                        self.signoff.apply(SignOffEvent::SubmitSucceeded);
                        if let (Some(share), Some(pending)) = (&mut self.share, session.pending.take()) {
                            info!(share = %share.id, "share signed");
                            share.status = ShareStatus::Signed;
                            share.signature = Some(SignatureRecord {
                                signature_data: pending.signature_data,
                                signer_name: pending.signer_name,
                                signed_at,
                            });
                        }
                        self.signing = None;
                    }
                    Err(e) => {
                        warn!(error = %e, "signature submit failed");
                        self.signoff.apply(SignOffEvent::SubmitFailed);
                        session.pending = None;
                        session.error = Some(format!("Could not submit your signature: {e}"));
                    }
                }
                Task::none()
            }
            Message::DownloadAll => self.download_all(),
            Message::ExportFinished(result) => {
                self.exporting = false;
                match result {
                    Ok(ExportOutcome::Saved { path, included, skipped }) => {
                        info!(included, skipped, "export finished");
                        self.status = Some(format!("Photos saved to {}", path.display()));
                    }
                    Ok(ExportOutcome::NothingToDo) => {}
                    Err(e) => {
                        error!(error = %e, "export failed");
                        MessageDialog::new()
                            .set_level(MessageLevel::Error)
                            .set_title("Download failed")
                            .set_description(format!("The photos could not be downloaded: {e}"))
                            .set_buttons(MessageButtons::Ok)
                            .show();
                    }
                }
                Task::none()
            }
        }
    }

    fn submit_signature(&mut self) -> Task<Message> {
        let (Some(session), Some(share), Some(store)) = (&mut self.signing, &self.share, &self.store) else {
            return Task::none();
        };
        if !self.signoff.can_submit(&session.signer_name, session.pad.has_content()) {
            return Task::none();
        }

        // The only place the raster is encoded
        let signature_data = match session.pad.to_data_uri() {
            Ok(uri) => uri,
            Err(e) => {
                session.error = Some(e.to_string());
                return Task::none();
            }
        };

        let submission = SignatureSubmission {
            signature_data,
            signer_name: session.signer_name.trim().to_string(),
        };
        session.pending = Some(submission.clone());
        session.error = None;
        self.signoff.apply(SignOffEvent::SubmitStarted);

        let store = Arc::clone(store);
        let id = share.id.clone();
        Task::perform(
            async move {
                store
                    .submit_signature(&id, &submission)
                    .await
                    .map_err(|e| e.to_string())
            },
            Message::SignatureSubmitted,
        )
    }

    fn download_all(&mut self) -> Task<Message> {
        if self.exporting {
            return Task::none();
        }
        let (Some(share), Some(fetcher)) = (&self.share, &self.fetcher) else {
            return Task::none();
        };
        if share.photos.is_empty() {
            return Task::none();
        }

        let date = Local::now().date_naive();
        let file_name = export::archive::archive_file_name(share.display_title(), date);

        let mut dialog = FileDialog::new()
            .set_title("Save Photos")
            .set_file_name(&file_name)
            .add_filter("Zip archive", &["zip"]);
        if let Some(dir) = self.config.export.download_dir() {
            dialog = dialog.set_directory(dir);
        }
        let Some(destination) = dialog.save_file() else {
            return Task::none();
        };

        self.exporting = true;
        self.status = None;
        Task::perform(
            export::download_all(
                Arc::clone(fetcher),
                share.photos.clone(),
                share.display_title().to_string(),
                date,
                destination,
            ),
            |result| Message::ExportFinished(result.map_err(|e| e.to_string())),
        )
    }

    fn header(share: &ShareLink) -> Column<'_, Message> {
        let mut header = column![text(share.display_title()).size(32)].spacing(6);
        if let Some(company) = share.company_name.as_deref() {
            header = header.push(text(format!("Shared by {company}")).size(16));
        }
        header = header.push(text(format!("Reference: {}", share.project_reference)).size(14));
        if let Some(message) = share.message.as_deref().filter(|m| !m.trim().is_empty()) {
            header = header.push(text(message).size(16));
        }
        header
    }

    fn notice<'a>(title: &'a str, body: &'a str) -> Element<'a, Message> {
        column![text(title).size(32), text(body).size(16)]
            .spacing(12)
            .align_x(Alignment::Center)
            .into()
    }

    fn start_view(&self) -> Element<'_, Message> {
        if self.resolving {
            return text("Loading…").size(20).into();
        }

        let mut content = column![
            text("Open a photo share").size(32),
            text_input("Paste the link or code you were sent", &self.link_input)
                .on_input(Message::LinkInputChanged)
                .on_submit(Message::OpenLink)
                .padding(10)
                .width(Length::Fixed(480.0)),
            button("Open").on_press(Message::OpenLink).padding(10),
        ]
        .spacing(16)
        .align_x(Alignment::Center);

        if let Some(status) = &self.status {
            content = content.push(text(status).size(14));
        }
        content.into()
    }

    fn signed_view(&self) -> Element<'_, Message> {
        let signature = self.share.as_ref().and_then(|share| share.signature.as_ref());
        let detail = match signature {
            Some(record) => format!(
                "Signed by {} on {}",
                record.signer_name,
                record.signed_at.with_timezone(&Local).format("%d %b %Y at %H:%M")
            ),
            None => "These photos have been reviewed and signed off.".to_string(),
        };

        let mut content = column![text("Signed off").size(32)]
            .spacing(12)
            .align_x(Alignment::Center);
        if let Some(share) = &self.share {
            content = content.push(text(share.display_title()).size(20));
        }
        content.push(text(detail).size(16)).into()
    }

    fn share_view<'a>(&'a self, share: &'a ShareLink) -> Element<'a, Message> {
        let download_label = if self.exporting {
            "Preparing download…"
        } else {
            "Download All"
        };
        let download = button(download_label)
            .padding(10)
            .on_press_maybe((!self.exporting && !share.photos.is_empty()).then_some(Message::DownloadAll));

        let mut toolbar = row![download].spacing(12);
        if self.signoff.requires_signature() && self.signoff.state() == SignOffState::Viewing {
            toolbar = toolbar.push(button("Sign Off").padding(10).on_press(Message::BeginSigning));
        }

        let mut top = Self::header(share).push(toolbar).spacing(16);
        if let Some(status) = &self.status {
            top = top.push(text(status).size(14));
        }
        // Kept out of the scrollable so canvas bounds and pointer events
        // share one coordinate space.
        if let Some(session) = &self.signing {
            top = top.push(self.signing_panel(session));
        }

        let gallery = scrollable(
            container(ui::gallery::view(
                &share.photos,
                &self.config.phases,
                &self.thumbnails,
            ))
            .width(Length::Fill),
        )
        .height(Length::Fill);

        column![top, gallery].spacing(20).padding(32).into()
    }

    fn signing_panel<'a>(&'a self, session: &'a SigningSession) -> Element<'a, Message> {
        let surface = &self.config.signature;
        let width = Length::Fixed(surface.width);
        let height = Length::Fixed(surface.height);
        let pad = stack![
            image(session.preview.clone()).width(width).height(height),
            canvas(SignatureSurface {
                stroke: &session.stroke,
                stroke_width: surface.stroke_width,
            })
            .width(width)
            .height(height),
        ];

        let submitting = self.signoff.is_submitting();
        let can_submit = self
            .signoff
            .can_submit(&session.signer_name, session.pad.has_content());

        let mut actions = row![].spacing(12);
        if session.pad.has_content() {
            actions = actions.push(
                button("Clear")
                    .padding(8)
                    .on_press_maybe((!submitting).then_some(Message::ClearSignature)),
            );
        }
        actions = actions
            .push(
                button("Cancel")
                    .padding(8)
                    .on_press_maybe((!submitting).then_some(Message::CancelSigning)),
            )
            .push(
                button(if submitting { "Submitting…" } else { "Submit Sign-Off" })
                    .padding(8)
                    .on_press_maybe(can_submit.then_some(Message::SubmitSignature)),
            );

        let mut panel = column![
            text("Sign to confirm you have reviewed these photos").size(20),
            text_input("Your full name", &session.signer_name)
                .on_input(Message::SignerNameChanged)
                .padding(8)
                .width(Length::Fixed(surface.width)),
            pad,
            actions,
        ]
        .spacing(12);

        if let Some(error) = &session.error {
            panel = panel.push(text(error).size(14).color(iced::Color::from_rgb8(239, 68, 68)));
        }
        container(panel).padding(16).into()
    }

    /// Build the user interface
    fn view(&self) -> Element<'_, Message> {
        let content: Element<'_, Message> = match (self.signoff.state(), &self.share) {
            (SignOffState::Loading, _) => self.start_view(),
            (SignOffState::Error, _) => Self::notice(
                "Link not found",
                "This share link doesn't exist. Check the link you were sent.",
            ),
            (SignOffState::Expired, _) => Self::notice(
                "Link expired",
                "This share link is no longer available. Ask your electrician for a new one.",
            ),
            (SignOffState::Signed, _) => self.signed_view(),
            (SignOffState::Viewing | SignOffState::Signing, Some(share)) => {
                return self.share_view(share);
            }
            (SignOffState::Viewing | SignOffState::Signing, None) => text("Loading…").into(),
        };

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Seed the local database from a JSON file and return the imported tokens.
fn import_shares(file: &Path) -> Result<Vec<String>, String> {
    let config = load_config();
    let db = config
        .store
        .sqlite_path
        .clone()
        .or_else(SqliteShareStore::default_path)
        .ok_or("could not determine a data directory")?;

    let json = std::fs::read_to_string(file).map_err(|e| format!("{}: {e}", file.display()))?;
    let store = SqliteShareStore::open(&db).map_err(|e| e.to_string())?;
    let tokens = store.import_json(&json).map_err(|e| e.to_string())?;
    info!(count = tokens.len(), db = %store.path().display(), "import finished");
    Ok(tokens)
}

fn main() -> iced::Result {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("--import") {
        let Some(file) = args.get(1) else {
            eprintln!("usage: photo-signoff --import <shares.json>");
            std::process::exit(2);
        };
        match import_shares(Path::new(file)) {
            Ok(tokens) => {
                for token in tokens {
                    println!("{token}");
                }
                return Ok(());
            }
            Err(e) => {
                error!("import failed: {e}");
                std::process::exit(1);
            }
        }
    }

    iced::application("Photo Sign-Off", PhotoSignOff::update, PhotoSignOff::view)
        .theme(PhotoSignOff::theme)
        .centered()
        .run_with(PhotoSignOff::new)
}
