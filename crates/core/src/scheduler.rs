use crate::command::{Command, Routine};
use crate::job::Jobs;
use crate::logger;
use crate::session::Session;
use crate::timing;
use crate::types::{HuntingStyle, Point, PointKind};

/// Builds one bounded routine per cycle from the map's points.
///
/// Every point but the last is revisited only after its cooldown; the last
/// point is the anchor and closes every routine. The remaining time until the
/// earliest cooldown expiry is filled with attack cycling.
pub struct RoutineScheduler {
    session: Session,
    points: Vec<Point>,
    last_used: Vec<Option<f64>>,
    style: HuntingStyle,
    attack: String,
    sub: Option<String>,
}

impl RoutineScheduler {
    pub fn new(session: Session, points: Vec<Point>, style: HuntingStyle) -> Self {
        let sub = secondary_action(&session.jobs);
        if let Some(s) = &sub {
            logger::info_p("sched", &format!("secondary attack '{}' detected", s));
        }
        let last_used = vec![None; points.len()];
        Self { session, points, last_used, style, attack: "attack".to_string(), sub }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn last_used(&self, index: usize) -> Option<f64> {
        self.last_used.get(index).copied().flatten()
    }

    pub fn next_routine(&mut self) -> Routine {
        let now = self.session.now();
        let tuning = &self.session.tuning.routine;
        let mut commands = Vec::new();
        let mut next_expiry = f64::INFINITY;
        let anchor = self.points.len().saturating_sub(1);

        for (i, point) in self.points.iter().enumerate() {
            if i == anchor {
                continue;
            }
            let ready = self.last_used[i].map_or(true, |t| now - t >= point.cooldown);
            let expiry = if ready {
                commands.push(Command::move_to(point.x, Some(point.y), tuning.move_tolerance));
                if matches!(point.kind, PointKind::Summon | PointKind::Portal) {
                    if let Some(key) = point.key.as_deref().filter(|k| !k.is_empty()) {
                        commands.push(Command::key(key, tuning.point_press));
                        commands.push(Command::wait(tuning.point_wait));
                    }
                }
                self.last_used[i] = Some(now);
                now + point.cooldown
            } else {
                self.last_used[i].unwrap_or(now) + point.cooldown
            };
            next_expiry = next_expiry.min(expiry);
        }

        if let Some(anchor) = self.points.last() {
            commands.push(Command::move_to(anchor.x, Some(anchor.y), tuning.move_tolerance));
        }

        let hunt_duration = (next_expiry - now).max(tuning.min_hunt).min(tuning.max_hunt);
        logger::info_p("sched", &format!("hunting for {:.1}s", hunt_duration));
        commands.extend(self.filler(hunt_duration));

        Routine { commands, hunt_duration }
    }

    fn filler(&self, duration: f64) -> Vec<Command> {
        let tuning = &self.session.tuning.routine;
        let mut out = Vec::new();
        match self.style {
            HuntingStyle::Stationary => {
                let mut remaining = duration;
                while remaining > 0.0 {
                    let chunk = timing::between(tuning.attack_chunk).min(remaining);
                    out.push(Command::key(&self.attack, chunk));
                    out.push(Command::wait(timing::between(tuning.attack_gap)));
                    if let Some(sub) = &self.sub {
                        if timing::chance(tuning.sub_chance) {
                            out.push(Command::key(sub, tuning.sub_press));
                            out.push(Command::wait(tuning.sub_wait));
                        }
                    }
                    remaining -= chunk;
                }
            }
            HuntingStyle::Portal => {
                // Each hop also spends the up tap and the settle wait.
                let hop = tuning.portal_up + tuning.portal_settle;
                let mut elapsed = 0.0;
                while elapsed < duration {
                    let atk = timing::between(tuning.portal_attack);
                    out.push(Command::key(&self.attack, atk));
                    out.push(Command::key("up", tuning.portal_up));
                    out.push(Command::wait(tuning.portal_settle));
                    elapsed += atk + hop;
                }
            }
        }
        out
    }
}

fn secondary_action(jobs: &Jobs) -> Option<String> {
    let job = jobs.current();
    ["sub_attack", "sub"]
        .into_iter()
        .find(|a| job.keys.get(*a).is_some_and(|k| !k.is_empty()))
        .map(str::to_string)
}
