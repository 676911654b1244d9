use std::sync::{mpsc, Arc};

use hunter_core::types::Control;
use hunter_core::worker::{Frame, Shared};

use crate::confirm::ConfirmDialog;

pub struct App {
    pub shared: Arc<Shared>,
    pub maps: Vec<String>,
    pub selected: usize,
    /// Map most recently asked of the worker.
    pub loaded: Option<String>,
    pub log_visible: bool,
    pub log_messages: Vec<String>,
    pub log_scroll: usize, // scroll offset from bottom (0 = latest)
    pub log_rx: mpsc::Receiver<String>,
    pub ctl_tx: mpsc::Sender<Control>,
    pub confirm: Option<ConfirmDialog>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        shared: Arc<Shared>,
        maps: Vec<String>,
        last_map: Option<&str>,
        log_rx: mpsc::Receiver<String>,
        ctl_tx: mpsc::Sender<Control>,
    ) -> Self {
        let selected = last_map.and_then(|m| maps.iter().position(|n| n == m)).unwrap_or(0);
        Self {
            shared,
            maps,
            selected,
            loaded: None,
            log_visible: true,
            log_messages: Vec::new(),
            log_scroll: 0,
            log_rx,
            ctl_tx,
            confirm: None,
            should_quit: false,
        }
    }

    /// Latest frame published by the worker.
    pub fn frame(&self) -> Arc<Frame> {
        self.shared.frame.read()
    }

    pub fn selected_map(&self) -> Option<&str> {
        self.maps.get(self.selected).map(String::as_str)
    }

    pub fn drain_logs(&mut self) {
        while let Ok(msg) = self.log_rx.try_recv() {
            self.log_messages.push(msg);
        }
    }

    pub fn scroll_log_up(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_add(n);
    }

    pub fn scroll_log_down(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(n);
    }

    pub fn move_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.maps.len() {
            self.selected += 1;
        }
    }

    pub fn load_selected(&mut self) {
        let Some(name) = self.selected_map().map(str::to_string) else { return };
        self.ctl_tx.send(Control::LoadMap(name.clone())).ok();
        self.loaded = Some(name);
    }

    pub fn toggle_enabled(&mut self) {
        self.shared.switches.toggle_enabled();
    }

    pub fn toggle_pause(&mut self) {
        let frame = self.frame();
        if !frame.status.running {
            return;
        }
        let msg = if frame.status.paused { Control::Resume } else { Control::Pause };
        self.ctl_tx.send(msg).ok();
    }

    pub fn toggle_log(&mut self) {
        self.log_visible = !self.log_visible;
    }

    /// Ask before quitting while a hunt is running.
    pub fn request_quit(&mut self) {
        if self.shared.switches.is_enabled() || self.frame().status.running {
            self.confirm = Some(ConfirmDialog::new("Hunt is running. Quit?"));
        } else {
            self.quit();
        }
    }

    pub fn close_confirm(&mut self, accepted: bool) {
        if self.confirm.take().is_some() && accepted {
            self.quit();
        }
    }

    pub fn quit(&mut self) {
        self.ctl_tx.send(Control::Quit).ok();
        self.should_quit = true;
    }
}
