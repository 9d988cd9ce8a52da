use glade_assets::AnimationClip;
use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// Which clip to loop on spawn, and how long one loop should take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSpec {
    pub clip_index: usize,
    /// Playback length of one loop in seconds. `None` keeps the clip's own.
    pub duration: Option<f32>,
}

impl Default for AnimationSpec {
    fn default() -> Self {
        Self {
            clip_index: 1,
            duration: Some(1.5),
        }
    }
}

/// Loops a single clip.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationPlayer {
    clip: AnimationClip,
    time: f32,
    time_scale: f32,
}

impl AnimationPlayer {
    pub fn new(clip: AnimationClip, playback_duration: Option<f32>) -> Self {
        let time_scale = match playback_duration {
            Some(d) if d > 0.0 && clip.duration > 0.0 => clip.duration / d,
            _ => 1.0,
        };
        Self {
            clip,
            time: 0.0,
            time_scale,
        }
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    /// Playback position within the clip, in clip seconds.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Advance by `dt` wall seconds, wrapping at the end of the clip.
    pub fn advance(&mut self, dt: f32) {
        if !(dt > 0.0) || self.clip.duration <= 0.0 {
            return;
        }
        self.time = (self.time + dt * self.time_scale).rem_euclid(self.clip.duration);
    }
}

/// Advance every entity's animation player. Returns how many advanced.
pub fn advance_animations(entities: &mut [Entity], dt: f32) -> usize {
    let mut advanced = 0;
    for player in entities.iter_mut().filter_map(Entity::animation_mut) {
        player.advance(dt);
        advanced += 1;
    }
    advanced
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk() -> AnimationClip {
        AnimationClip {
            name: "Walk".into(),
            duration: 3.0,
        }
    }

    #[test]
    fn playback_duration_sets_time_scale() {
        let p = AnimationPlayer::new(walk(), Some(1.5));
        assert_eq!(p.time_scale(), 2.0);
        let p = AnimationPlayer::new(walk(), None);
        assert_eq!(p.time_scale(), 1.0);
    }

    #[test]
    fn advance_wraps_around() {
        let mut p = AnimationPlayer::new(walk(), Some(1.5));
        p.advance(1.0);
        assert!((p.time() - 2.0).abs() < 1e-6);
        p.advance(1.0);
        assert!((p.time() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn zero_length_clip_stays_at_start() {
        let mut p = AnimationPlayer::new(
            AnimationClip {
                name: "Pose".into(),
                duration: 0.0,
            },
            Some(1.5),
        );
        p.advance(0.5);
        assert_eq!(p.time(), 0.0);
    }

    #[test]
    fn non_positive_dt_is_ignored() {
        let mut p = AnimationPlayer::new(walk(), None);
        p.advance(0.0);
        p.advance(-1.0);
        assert_eq!(p.time(), 0.0);
    }
}
