//! Bone hierarchies and skeletal animation.
//!
//! A [`Skeleton`] is an immutable bone tree plus an ordered set of named
//! [`Animation`]s. It always contains the pose animation (`"POS"`), built
//! from the single-frame tracks found on the skeleton definition.
//!
//! Bones and tracks are matched by key, the bone name without its actor
//! code (see [`bone_key`](crate::names::bone_key)), so animations can be
//! copied between actors that share a rig convention.
//!
//! # Example
//!
//! ```ignore
//! let mut skeleton = Skeleton::from_def(&wld, skeleton_id, &settings)?;
//! skeleton.copy_animations_from(&donor);
//! let bones = skeleton.transformations_at_time("C01", elapsed).unwrap_or_default();
//! ```

mod animation;
mod transform;

pub use animation::{Animation, Track};
pub use transform::{BoneTransform, DualQuat};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::names::{POSE_ANIMATION, bone_key};
use crate::settings::ImportSettings;
use crate::wld::{FragmentId, WldData, WldError};

/// One bone of a [`Skeleton`].
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonNode {
    name: String,
    key: String,
    /// Mesh attached to this bone, if any.
    pub mesh: Option<FragmentId>,
    /// Child bone indices.
    pub children: Vec<usize>,
}

impl SkeletonNode {
    pub fn new(name: impl Into<String>, children: Vec<usize>) -> Self {
        let name = name.into();
        Self {
            key: bone_key(&name),
            name,
            mesh: None,
            children,
        }
    }

    /// Attach a mesh to this bone.
    #[must_use]
    pub fn with_mesh(mut self, mesh: FragmentId) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Actor-independent bone key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// A bone tree and its animations.
#[derive(Debug, Clone)]
pub struct Skeleton {
    name: String,
    bones: Vec<SkeletonNode>,
    animations: Vec<Animation>,
    settings: ImportSettings,
}

impl Skeleton {
    /// Create a skeleton from its bones. Bone 0 is the root.
    ///
    /// Fails unless the bones form a single tree rooted at bone 0.
    pub fn new(
        name: impl Into<String>,
        bones: Vec<SkeletonNode>,
        settings: &ImportSettings,
    ) -> Result<Self, WldError> {
        let name = name.into();
        validate_tree(&name, &bones)?;
        let pose = Animation::new(POSE_ANIMATION, bones.len(), settings);
        Ok(Self {
            name,
            bones,
            animations: vec![pose],
            settings: settings.clone(),
        })
    }

    /// Build a skeleton from its definition, with the pose animation
    /// populated from the bones' own tracks.
    pub fn from_def(
        wld: &WldData,
        id: FragmentId,
        settings: &ImportSettings,
    ) -> Result<Self, WldError> {
        let def = wld.skeleton(id)?;
        let bones = def
            .bones
            .iter()
            .map(|b| SkeletonNode {
                name: b.name.clone(),
                key: bone_key(&b.name),
                mesh: b.mesh,
                children: b.children.iter().map(|&c| c as usize).collect(),
            })
            .collect();
        let mut skeleton = Self::new(def.name.clone(), bones, settings)?;

        for (index, bone) in def.bones.iter().enumerate() {
            let Some(track_id) = bone.track else {
                continue;
            };
            match wld.track(track_id) {
                Ok(track) => {
                    let track = Arc::new(Track::pose(track));
                    skeleton.animations[0].set_track(index, Some(track));
                }
                Err(e) => log::warn!("Skeleton '{}': bone '{}': {e}", def.name, bone.name),
            }
        }
        Ok(skeleton)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bones(&self) -> &[SkeletonNode] {
        &self.bones
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Index of the first bone with the given name or key.
    pub fn find_bone(&self, name: &str) -> Option<usize> {
        let key = name.to_ascii_uppercase();
        self.bones
            .iter()
            .position(|b| b.name.eq_ignore_ascii_case(name))
            .or_else(|| self.bones.iter().position(|b| b.key == key))
    }

    /// Meshes attached to bones, as `(bone, mesh)` pairs.
    pub fn attachments(&self) -> impl Iterator<Item = (usize, FragmentId)> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.mesh.map(|m| (i, m)))
    }

    /// The pose animation.
    pub fn pose(&self) -> &Animation {
        &self.animations[0]
    }

    pub fn animation(&self, name: &str) -> Option<&Animation> {
        self.animations.iter().find(|a| a.name() == name)
    }

    pub fn animation_mut(&mut self, name: &str) -> Option<&mut Animation> {
        self.animations.iter_mut().find(|a| a.name() == name)
    }

    /// Animation names in insertion order, starting with the pose.
    pub fn animation_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.animations.iter().map(Animation::name)
    }

    /// Attach a track to an animation.
    ///
    /// A missing animation is created as a copy of the pose, so bones
    /// without a track of their own keep their rest transform. Returns
    /// `false` when no bone matches the track.
    pub fn add_track(&mut self, animation: &str, track: Arc<Track>) -> bool {
        if self.animation(animation).is_none() {
            if self.find_bone(track.bone()).is_none() {
                log::debug!(
                    "Skeleton '{}': no bone for track '{}'",
                    self.name,
                    track.name()
                );
                return false;
            }
            let mut anim = self.pose().renamed(animation);
            anim.set_frame_duration(track.frame_duration().unwrap_or(self.settings.frame_duration));
            self.animations.push(anim);
        }
        self.replace_track(animation, track)
    }

    /// Replace the track of the bone matching `track` in an existing
    /// animation. Returns `false` if either the animation or the bone is
    /// missing.
    pub fn replace_track(&mut self, animation: &str, track: Arc<Track>) -> bool {
        let Some(bone) = self.find_bone(track.bone()) else {
            log::debug!(
                "Skeleton '{}': no bone for track '{}'",
                self.name,
                track.name()
            );
            return false;
        };
        match self.animation_mut(animation) {
            Some(anim) => {
                anim.set_track(bone, Some(track));
                true
            }
            None => false,
        }
    }

    /// Copy every animation except the pose from `other`.
    pub fn copy_animations_from(&mut self, other: &Skeleton) {
        for name in other.animation_names() {
            if name != POSE_ANIMATION {
                self.copy_from(other, name);
            }
        }
    }

    /// Copy one animation from `other`, matching bones by key.
    ///
    /// Donor tracks for bones this skeleton lacks are dropped; bones the
    /// donor does not animate keep this skeleton's pose. An existing
    /// animation with the same name is replaced. Returns `false` if the
    /// donor has no such animation.
    pub fn copy_from(&mut self, other: &Skeleton, name: &str) -> bool {
        let Some(donor) = other.animation(name) else {
            return false;
        };

        let mut donor_bones: HashMap<&str, usize> = HashMap::new();
        for (i, bone) in other.bones.iter().enumerate() {
            donor_bones.entry(bone.key.as_str()).or_insert(i);
        }

        let mut anim = Animation::new(name, self.bones.len(), &self.settings);
        anim.set_repeating(donor.is_repeating());
        for (i, bone) in self.bones.iter().enumerate() {
            let track = donor_bones
                .get(bone.key.as_str())
                .and_then(|&j| donor.track(j))
                .or_else(|| self.animations[0].track(i))
                .cloned();
            anim.set_track(i, track);
        }
        anim.set_frame_duration(donor.frame_duration());

        match self.animations.iter_mut().find(|a| a.name() == name) {
            Some(existing) => *existing = anim,
            None => self.animations.push(anim),
        }
        true
    }

    /// Global bone transforms at a fractional frame, indexed by bone.
    ///
    /// Returns `None` for an unknown animation.
    pub fn transformations_at_frame(&self, animation: &str, frame: f32) -> Option<Vec<BoneTransform>> {
        let anim = self.animation(animation)?;
        let mut out = vec![BoneTransform::IDENTITY; self.bones.len()];
        if self.bones.is_empty() {
            return Some(out);
        }

        let mut stack = vec![(0usize, BoneTransform::IDENTITY)];
        while let Some((bone, parent)) = stack.pop() {
            let global = parent.compose(&anim.bone_transform(bone, frame));
            out[bone] = global;
            for &child in &self.bones[bone].children {
                stack.push((child, global));
            }
        }
        Some(out)
    }

    /// Global bone transforms after `time` has elapsed, using the
    /// animation's frame duration.
    pub fn transformations_at_time(&self, animation: &str, time: Duration) -> Option<Vec<BoneTransform>> {
        let frame = self.animation(animation)?.frame_at(time);
        self.transformations_at_frame(animation, frame)
    }
}

fn validate_tree(name: &str, bones: &[SkeletonNode]) -> Result<(), WldError> {
    let malformed = |reason: String| WldError::MalformedSkeleton {
        name: name.to_owned(),
        reason,
    };
    if bones.is_empty() {
        return Ok(());
    }

    let mut has_parent = vec![false; bones.len()];
    for (i, bone) in bones.iter().enumerate() {
        for &child in &bone.children {
            if child >= bones.len() {
                return Err(malformed(format!("bone {i} has out-of-range child {child}")));
            }
            if child == 0 {
                return Err(malformed(format!("bone {i} has the root as a child")));
            }
            if std::mem::replace(&mut has_parent[child], true) {
                return Err(malformed(format!("bone {child} has more than one parent")));
            }
        }
    }

    let mut visited = vec![false; bones.len()];
    let mut stack = vec![0usize];
    while let Some(i) = stack.pop() {
        visited[i] = true;
        stack.extend(bones[i].children.iter().copied());
    }
    match visited.iter().position(|v| !v) {
        Some(orphan) => Err(malformed(format!("bone {orphan} is not reachable from the root"))),
        None => Ok(()),
    }
}
