use crate::logger;
use crate::session::Session;
use crate::timing;

/// Attack holding and skill presses. Bindings are read at call time.
#[derive(Clone)]
pub struct Combat {
    session: Session,
}

impl Combat {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Hold the main attack, plus the aux skill when it runs in sync mode.
    pub fn hold_attack(&self) {
        let job = self.session.jobs.current();
        if let Some(key) = job.key("attack") {
            self.session.hw.hold(&key);
        }
        if let Some(aux) = job.aux_skill.sync_key() {
            self.session.hw.hold(aux);
        }
    }

    pub fn release_attack(&self) {
        let job = self.session.jobs.current();
        if let Some(key) = job.key("attack") {
            self.session.hw.release(&key);
        }
        if let Some(aux) = job.aux_skill.sync_key() {
            self.session.hw.release(aux);
        }
    }

    pub fn use_summon_at_index(&self, index: usize) {
        let skills = self.session.jobs.skills();
        let Some(key) = skills.summons.get(index) else {
            logger::warn_p("hunt", &format!("no summon skill bound for slot {}", index + 1));
            return;
        };
        self.session.press(key, timing::gauss(0.25, 0.02));
        self.session.wait_between(0.75, 0.9);
    }

    pub fn install_portal(&self) {
        let Some(key) = self.session.jobs.skills().portal else { return };
        self.session.press(&key, timing::uniform(0.15, 0.25));
        self.session.wait_between(0.75, 0.95);
    }

    /// Up-jump through the portal above, then resume attacking.
    pub fn use_upper_portal(&self) {
        self.release_attack();
        self.session.hw.hold("up");
        self.session.wait_between(0.45, 0.58);
        self.session.hw.release("up");
        self.session.wait_between(0.02, 0.06);
        self.hold_attack();
    }
}
