use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use eframe::egui::{self, Context};
use tracing::{info, warn};

use topology_lens::layout::LayoutParams;
use topology_lens::projection::{NamespaceFilter, ViewMode};
use topology_lens::session::Session;
use topology_lens::source::{Snapshot, SnapshotSource, spawn_poller};

mod graph;
mod ui;

const IDLE_REPAINT: Duration = Duration::from_millis(250);

pub struct AppSettings {
    pub source: SnapshotSource,
    pub interval: Duration,
    pub params: LayoutParams,
    pub mode: ViewMode,
    pub filter: NamespaceFilter,
}

pub struct TopologyApp {
    settings: AppSettings,
    rx: Receiver<Result<Snapshot, String>>,
    state: AppState,
}

enum AppState {
    Waiting,
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    session: Session,
    source_label: String,
    search: String,
    show_labels: bool,
    hovered: Option<usize>,
    refreshes: u64,
    last_refresh: Instant,
    refresh_error: Option<String>,
}

impl TopologyApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, settings: AppSettings) -> Self {
        let rx = spawn_poller(settings.source.clone(), settings.interval);
        Self {
            settings,
            rx,
            state: AppState::Waiting,
        }
    }

    fn restart_poller(&mut self) {
        info!(source = %self.settings.source.describe(), "restarting snapshot poller");
        self.rx = spawn_poller(self.settings.source.clone(), self.settings.interval);
    }

    fn drain_snapshots(&mut self) {
        loop {
            let result = match self.rx.try_recv() {
                Ok(result) => result,
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    warn!("snapshot poller disconnected");
                    self.fail("Snapshot poller disconnected".to_owned());
                    return;
                }
            };

            match result {
                Ok(snapshot) => {
                    if let AppState::Ready(model) = &mut self.state {
                        model.apply_snapshot(snapshot);
                    } else {
                        self.state =
                            AppState::Ready(Box::new(ViewModel::new(&self.settings, snapshot)));
                    }
                }
                Err(error) => self.fail(error),
            }
        }
    }

    fn fail(&mut self, error: String) {
        if let AppState::Ready(model) = &mut self.state {
            model.refresh_error = Some(error);
        } else {
            self.state = AppState::Error(error);
        }
    }
}

impl eframe::App for TopologyApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.drain_snapshots();

        let mut retry = false;
        match &mut self.state {
            AppState::Waiting => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Waiting for the first topology snapshot...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load topology snapshot");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        retry = true;
                    }
                });
            }
            AppState::Ready(model) => {
                model.show(ctx);
                if model.is_animating() {
                    ctx.request_repaint();
                }
            }
        }

        if retry {
            self.state = AppState::Waiting;
            self.restart_poller();
        }
        ctx.request_repaint_after(IDLE_REPAINT);
    }
}
