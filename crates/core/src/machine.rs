use crate::command::{Command, CommandContext, Routine};

/// Steps through a routine one command per tick.
///
/// The index stays within `[0, len]`. A non-looping machine clamps at the
/// last command once it completes; further steps are no-ops and
/// `is_finished` reports true.
#[derive(Debug, Default)]
pub struct Machine {
    commands: Vec<Command>,
    index: usize,
    looping: bool,
    finished: bool,
}

impl Machine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_routine(&mut self, routine: Routine, looping: bool) {
        self.commands = routine.commands;
        self.index = 0;
        self.looping = looping;
        self.finished = false;
    }

    pub fn step(&mut self, ctx: &CommandContext<'_>) {
        if self.commands.is_empty() || self.finished {
            return;
        }
        if !self.commands[self.index].attempt(ctx) {
            return;
        }
        self.index += 1;
        if self.index >= self.commands.len() {
            if self.looping {
                self.index = 0;
                self.rearm();
            } else {
                self.index = self.commands.len() - 1;
                self.finished = true;
            }
        }
    }

    /// Looping routines replay waits and moves from scratch.
    fn rearm(&mut self) {
        self.commands.iter_mut().for_each(Command::rearm);
    }

    /// Restart the timer of the command in progress, after the hunt was
    /// held up by a pause, a rune or a break.
    pub fn rearm_current(&mut self) {
        if let Some(cmd) = self.commands.get_mut(self.index) {
            cmd.rearm();
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// True when a non-looping routine has run its last command, or there is nothing to run.
    pub fn is_finished(&self) -> bool {
        self.finished || self.commands.is_empty()
    }

    pub fn current(&self) -> Option<&Command> {
        self.commands.get(self.index)
    }
}
