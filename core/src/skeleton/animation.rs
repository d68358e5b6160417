//! Keyframe tracks and named animations.

use std::sync::Arc;
use std::time::Duration;

use crate::names::{TrackName, bone_key, explode_track_name};
use crate::settings::ImportSettings;
use crate::wld::TrackDef;

use super::BoneTransform;

/// Keyframes for a single bone.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    name: String,
    bone: String,
    frames: Vec<BoneTransform>,
    frame_duration: Option<Duration>,
}

impl Track {
    /// Create a track driving the bone whose key is `bone`.
    pub fn new(name: impl Into<String>, bone: impl Into<String>, frames: Vec<BoneTransform>) -> Self {
        Self {
            name: name.into(),
            bone: bone.into(),
            frames,
            frame_duration: None,
        }
    }

    /// Set the authored frame duration.
    #[must_use]
    pub fn with_frame_duration(mut self, duration: Duration) -> Self {
        self.frame_duration = Some(duration);
        self
    }

    /// Build a pose track (`<ACTOR><BONE>_TRACK`) from its definition.
    pub fn pose(def: &TrackDef) -> Self {
        Self {
            name: def.name.clone(),
            bone: bone_key(&def.name),
            frames: def.frames.clone(),
            frame_duration: def.frame_duration,
        }
    }

    /// Build an animation track (`<ANIM><ACTOR><BONE>_TRACK`) from its
    /// definition, returning the decoded name alongside it.
    pub fn animation(def: &TrackDef) -> Option<(TrackName, Self)> {
        let decoded = explode_track_name(&def.name)?;
        let track = Self {
            name: def.name.clone(),
            bone: decoded.bone.clone(),
            frames: def.frames.clone(),
            frame_duration: def.frame_duration,
        };
        Some((decoded, track))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key of the bone this track drives.
    pub fn bone(&self) -> &str {
        &self.bone
    }

    pub fn frames(&self) -> &[BoneTransform] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_duration(&self) -> Option<Duration> {
        self.frame_duration
    }

    /// Evaluate at a fractional frame.
    ///
    /// Looping tracks wrap at their own frame count; others clamp to the
    /// last frame. Integer frames return the stored keyframe exactly.
    pub fn evaluate(&self, frame: f32, looping: bool) -> BoneTransform {
        let count = self.frames.len();
        if count == 0 {
            return BoneTransform::IDENTITY;
        }
        let frame = if frame.is_finite() { frame } else { 0.0 };
        let base = frame.floor();
        let t = frame - base;

        let (i0, i1) = if looping {
            let i0 = (base as i64).rem_euclid(count as i64) as usize;
            (i0, (i0 + 1) % count)
        } else {
            if base < 0.0 {
                return self.frames[0];
            }
            let i0 = base as usize;
            if i0 >= count - 1 {
                return self.frames[count - 1];
            }
            (i0, i0 + 1)
        };
        BoneTransform::interpolate(&self.frames[i0], &self.frames[i1], t)
    }
}

/// A named set of per-bone tracks bound to one skeleton.
///
/// Tracks are shared ([`Arc`]) so animations can be copied between
/// skeletons without duplicating keyframes.
#[derive(Debug, Clone)]
pub struct Animation {
    name: String,
    tracks: Vec<Option<Arc<Track>>>,
    frame_duration: Duration,
    repeating: bool,
}

impl Animation {
    /// Create an animation with no tracks for `bone_count` bones.
    pub fn new(name: impl Into<String>, bone_count: usize, settings: &ImportSettings) -> Self {
        Self {
            name: name.into(),
            tracks: vec![None; bone_count],
            frame_duration: settings.frame_duration,
            repeating: settings.loop_animations,
        }
    }

    /// Copy of this animation under another name.
    pub(crate) fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Track of a bone, if any.
    pub fn track(&self, bone: usize) -> Option<&Arc<Track>> {
        self.tracks.get(bone).and_then(Option::as_ref)
    }

    /// Replace the track of a bone. Out-of-range bones are ignored.
    pub fn set_track(&mut self, bone: usize, track: Option<Arc<Track>>) {
        if let Some(authored) = track.as_ref().and_then(|t| t.frame_duration())
            && self.tracks.iter().all(Option::is_none)
        {
            self.frame_duration = authored;
        }
        if let Some(slot) = self.tracks.get_mut(bone) {
            *slot = track;
        }
    }

    pub fn bone_count(&self) -> usize {
        self.tracks.len()
    }

    /// Number of frames of the longest track.
    pub fn frame_count(&self) -> usize {
        self.tracks
            .iter()
            .flatten()
            .map(|t| t.frame_count())
            .max()
            .unwrap_or(0)
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    pub fn set_frame_duration(&mut self, duration: Duration) {
        self.frame_duration = duration;
    }

    /// Total play time.
    pub fn duration(&self) -> Duration {
        self.frame_duration * self.frame_count() as u32
    }

    pub fn is_repeating(&self) -> bool {
        self.repeating
    }

    pub fn set_repeating(&mut self, repeating: bool) {
        self.repeating = repeating;
    }

    /// Fractional frame reached after `time` has elapsed.
    pub fn frame_at(&self, time: Duration) -> f32 {
        let frame_ms = self.frame_duration.as_secs_f64() * 1000.0;
        if frame_ms <= 0.0 {
            return 0.0;
        }
        (time.as_secs_f64() * 1000.0 / frame_ms) as f32
    }

    /// Local transform of one bone. Bones without a track are identity.
    pub fn bone_transform(&self, bone: usize, frame: f32) -> BoneTransform {
        match self.track(bone) {
            Some(track) => track.evaluate(frame, self.repeating),
            None => BoneTransform::IDENTITY,
        }
    }
}
