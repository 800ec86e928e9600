//! Block, section and junction reservations.
//!
//! Three resource classes are tracked. Blocks (physical tracks, shared by
//! both travel directions) and interlocking nodes have at most one holder.
//! Sections may be held by several trains at once, all travelling the same
//! way; the direction lock lives exactly as long as some block of the
//! section is held.

mod types;

pub use types::{Blocked, BlockedReason, ReservationListing, ReservationOutcome, ResourceKind};

use log::debug;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{Path, TravelDirection};

#[derive(Debug, Clone)]
struct SectionLock {
    direction: TravelDirection,
    /// Train id → number of blocks it holds in the section
    holders: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default)]
struct TrainReservations {
    /// Held block → its section
    blocks: HashMap<String, String>,
    nodes: HashSet<String>,
    /// Oldest path segment not yet released behind the train
    release_cursor: usize,
    /// Last path segment reserved by a forward scan
    reserved_through: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ReservationSystem {
    blocks: HashMap<String, String>,
    nodes: HashMap<String, String>,
    sections: HashMap<String, SectionLock>,
    trains: HashMap<String, TrainReservations>,
}

impl ReservationSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) tracking a train with nothing held
    pub fn begin_train(&mut self, train_id: &str) {
        self.release_all(train_id, None);
        self.trains.insert(train_id.to_string(), TrainReservations::default());
    }

    /// Release everything a train holds and forget it
    pub fn clear_train(&mut self, train_id: &str) {
        self.release_all(train_id, None);
        self.trains.remove(train_id);
    }

    /// Release everything except `keep_block`, the block the train stands on
    pub fn yield_train(&mut self, train_id: &str, keep_block: Option<&str>) {
        debug!("Train {train_id} yields, keeping {keep_block:?}");
        self.release_all(train_id, keep_block);
        if let Some(state) = self.trains.get_mut(train_id) {
            state.reserved_through = None;
        }
    }

    /// Yield while moving. Everything the train can no longer stop short of
    /// stays held: the blocks of segments starting before `stop_offset`, the
    /// interlocking nodes at their entries, and anything behind the train not
    /// yet released. Returns the path offset where the kept stretch ends.
    pub fn yield_beyond(
        &mut self,
        train_id: &str,
        path: &Path,
        current_segment: usize,
        stop_offset: f64,
    ) -> f64 {
        let through = path
            .segments
            .iter()
            .enumerate()
            .skip(current_segment + 1)
            .take_while(|(_, s)| s.start_distance < stop_offset)
            .last()
            .map_or(current_segment, |(i, _)| i);
        let kept_until = path.segments.get(through).map_or(stop_offset, |s| s.end_distance);

        let Some(state) = self.trains.get(train_id) else {
            return kept_until;
        };
        let cursor = state.release_cursor.min(current_segment);
        let kept = path.segments.get(cursor..=through).unwrap_or_default();
        let keep_blocks: HashSet<&str> = kept.iter().map(|s| s.track_id.as_str()).collect();
        let keep_nodes: HashSet<&str> = kept
            .iter()
            .filter(|s| s.from_interlocking)
            .map(|s| s.from_node.as_str())
            .collect();
        let blocks: Vec<String> = state
            .blocks
            .keys()
            .filter(|b| !keep_blocks.contains(b.as_str()))
            .cloned()
            .collect();
        let nodes: Vec<String> = state
            .nodes
            .iter()
            .filter(|n| !keep_nodes.contains(n.as_str()))
            .cloned()
            .collect();
        debug!(
            "Train {train_id} yields beyond {stop_offset:.0} m, releasing {} blocks and {} nodes",
            blocks.len(),
            nodes.len()
        );

        for block in blocks {
            self.release_block(train_id, &block);
        }
        for node in nodes {
            self.release_node(train_id, &node);
        }
        let state = self.train_mut(train_id);
        state.reserved_through = state.reserved_through.map(|r| r.min(through));
        kept_until
    }

    /// Prepare a train for a new path, keeping only the block it stands on
    pub fn restart_train(&mut self, train_id: &str, keep_block: Option<&str>) {
        self.yield_train(train_id, keep_block);
        self.train_mut(train_id).release_cursor = 0;
    }

    /// Per-tick reservation pass.
    ///
    /// Releases segments lying entirely more than `release_behind` metres
    /// behind `current_offset`, then reserves forward from `current_segment`
    /// until `lookahead` metres past the train are covered or something is
    /// held by another train. The current segment is always scanned.
    pub fn update_train(
        &mut self,
        train_id: &str,
        path: &Path,
        current_segment: usize,
        current_offset: f64,
        lookahead: f64,
        release_behind: f64,
    ) -> ReservationOutcome {
        self.trains.entry(train_id.to_string()).or_default();
        self.release_behind(train_id, path, current_offset - release_behind);

        let mut outcome = ReservationOutcome {
            reserved_until: current_offset,
            blocked: None,
        };
        let horizon = current_offset + lookahead;

        for (i, segment) in path.segments.iter().enumerate().skip(current_segment) {
            if i > current_segment && segment.start_distance >= horizon {
                break;
            }

            // (a) interlocking node at the segment entry, unless already passed
            let mut acquired_node = None;
            if segment.from_interlocking && segment.start_distance >= current_offset {
                match self.nodes.get(&segment.from_node) {
                    Some(holder) if holder != train_id => {
                        outcome.blocked = Some(Blocked {
                            offset: segment.start_distance,
                            block_id: segment.track_id.clone(),
                            reason: BlockedReason::Junction,
                            resource_id: segment.from_node.clone(),
                            by_train: holder.clone(),
                        });
                        break;
                    }
                    Some(_) => {}
                    None => {
                        self.nodes.insert(segment.from_node.clone(), train_id.to_string());
                        self.train_mut(train_id).nodes.insert(segment.from_node.clone());
                        acquired_node = Some(segment.from_node.clone());
                    }
                }
            }

            // (b) section direction, then (c) the block itself
            let conflict = self
                .section_conflict(train_id, &segment.section_id, segment.section_direction)
                .map(|holder| (BlockedReason::SectionDirection, segment.section_id.clone(), holder))
                .or_else(|| {
                    self.blocks
                        .get(&segment.track_id)
                        .filter(|holder| holder.as_str() != train_id)
                        .map(|holder| (BlockedReason::Block, segment.track_id.clone(), holder.clone()))
                });

            if let Some((reason, resource_id, by_train)) = conflict {
                // Do not sit on a junction while waiting for the track beyond it
                if let Some(node) = acquired_node {
                    self.release_node(train_id, &node);
                }
                outcome.blocked = Some(Blocked {
                    offset: segment.start_distance,
                    block_id: segment.track_id.clone(),
                    reason,
                    resource_id,
                    by_train,
                });
                break;
            }

            self.acquire_block(train_id, &segment.track_id, &segment.section_id, segment.section_direction);
            outcome.reserved_until = segment.end_distance;
            let state = self.train_mut(train_id);
            state.reserved_through = Some(state.reserved_through.map_or(i, |r| r.max(i)));
        }

        if let Some(blocked) = &outcome.blocked {
            debug!(
                "Train {train_id} blocked at {:.0} m by {} ({} {})",
                blocked.offset,
                blocked.by_train,
                blocked.reason.as_str(),
                blocked.resource_id
            );
        }
        outcome
    }

    /// Holder of a section in the opposite direction, if any. A section held
    /// only by `train_id` is turned to the new direction instead.
    fn section_conflict(&mut self, train_id: &str, section_id: &str, direction: TravelDirection) -> Option<String> {
        let lock = self.sections.get_mut(section_id)?;
        if lock.direction == direction {
            return None;
        }
        if let Some(other) = lock.holders.keys().find(|h| h.as_str() != train_id) {
            return Some(other.clone());
        }
        lock.direction = direction;
        None
    }

    fn acquire_block(&mut self, train_id: &str, track_id: &str, section_id: &str, direction: TravelDirection) {
        if self.blocks.get(track_id).is_some_and(|h| h == train_id) {
            return;
        }
        self.blocks.insert(track_id.to_string(), train_id.to_string());
        self.train_mut(train_id)
            .blocks
            .insert(track_id.to_string(), section_id.to_string());
        let lock = self
            .sections
            .entry(section_id.to_string())
            .or_insert_with(|| SectionLock {
                direction,
                holders: BTreeMap::new(),
            });
        *lock.holders.entry(train_id.to_string()).or_insert(0) += 1;
    }

    fn release_block(&mut self, train_id: &str, track_id: &str) {
        if self.blocks.get(track_id).is_some_and(|h| h == train_id) {
            self.blocks.remove(track_id);
        }
        let Some(section_id) = self.trains.get_mut(train_id).and_then(|s| s.blocks.remove(track_id)) else {
            return;
        };
        let Some(lock) = self.sections.get_mut(&section_id) else {
            return;
        };
        if let Some(count) = lock.holders.get_mut(train_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                lock.holders.remove(train_id);
            }
        }
        if lock.holders.is_empty() {
            self.sections.remove(&section_id);
        }
    }

    fn release_node(&mut self, train_id: &str, node_id: &str) {
        if self.nodes.get(node_id).is_some_and(|h| h == train_id) {
            self.nodes.remove(node_id);
        }
        if let Some(state) = self.trains.get_mut(train_id) {
            state.nodes.remove(node_id);
        }
    }

    fn release_all(&mut self, train_id: &str, keep_block: Option<&str>) {
        let Some(state) = self.trains.get(train_id) else {
            return;
        };
        let blocks: Vec<String> = state
            .blocks
            .keys()
            .filter(|b| Some(b.as_str()) != keep_block)
            .cloned()
            .collect();
        let nodes: Vec<String> = state.nodes.iter().cloned().collect();
        for block in blocks {
            self.release_block(train_id, &block);
        }
        for node in nodes {
            self.release_node(train_id, &node);
        }
    }

    /// Slide the release cursor over segments that end before `limit`
    fn release_behind(&mut self, train_id: &str, path: &Path, limit: f64) {
        let Some(state) = self.trains.get(train_id) else {
            return;
        };
        let mut cursor = state.release_cursor;
        let reserved_through = state.reserved_through;

        while let Some(segment) = path.segments.get(cursor) {
            if segment.end_distance > limit {
                break;
            }
            // Paths revisiting a track keep it while a later reserved segment needs it
            let needed_later = reserved_through.is_some_and(|through| {
                path.segments
                    .get(cursor + 1..=through)
                    .is_some_and(|rest| rest.iter().any(|s| s.track_id == segment.track_id))
            });
            if !needed_later {
                self.release_block(train_id, &segment.track_id);
            }
            if path
                .segments
                .get(cursor + 1)
                .is_some_and(|next| next.from_interlocking)
            {
                self.release_node(train_id, &segment.to_node);
            }
            cursor += 1;
        }

        self.train_mut(train_id).release_cursor = cursor;
    }

    fn train_mut(&mut self, train_id: &str) -> &mut TrainReservations {
        self.trains.entry(train_id.to_string()).or_default()
    }

    #[must_use]
    pub fn holder_of_block(&self, track_id: &str) -> Option<&str> {
        self.blocks.get(track_id).map(String::as_str)
    }

    #[must_use]
    pub fn holder_of_node(&self, node_id: &str) -> Option<&str> {
        self.nodes.get(node_id).map(String::as_str)
    }

    /// Current direction lock of a section, `None` when unlocked
    #[must_use]
    pub fn section_direction(&self, section_id: &str) -> Option<TravelDirection> {
        self.sections.get(section_id).map(|l| l.direction)
    }

    /// Blocks held by a train, sorted
    #[must_use]
    pub fn held_blocks(&self, train_id: &str) -> Vec<String> {
        let mut blocks: Vec<String> = self
            .trains
            .get(train_id)
            .map(|s| s.blocks.keys().cloned().collect())
            .unwrap_or_default();
        blocks.sort();
        blocks
    }

    /// Interlocking nodes held by a train, sorted
    #[must_use]
    pub fn held_nodes(&self, train_id: &str) -> Vec<String> {
        let mut nodes: Vec<String> = self
            .trains
            .get(train_id)
            .map(|s| s.nodes.iter().cloned().collect())
            .unwrap_or_default();
        nodes.sort();
        nodes
    }

    /// Whether a block is held by a train other than `viewer`
    #[must_use]
    pub fn is_block_reserved_by_other(&self, track_id: &str, viewer: Option<&str>) -> bool {
        self.blocks
            .get(track_id)
            .is_some_and(|holder| Some(holder.as_str()) != viewer)
    }

    #[must_use]
    pub fn is_tracking(&self, train_id: &str) -> bool {
        self.trains.contains_key(train_id)
    }

    /// Ownership table sorted by resource kind and id
    #[must_use]
    pub fn listing(&self) -> Vec<ReservationListing> {
        let mut rows: Vec<ReservationListing> = self
            .blocks
            .iter()
            .map(|(id, holder)| ReservationListing {
                kind: ResourceKind::Block,
                resource_id: id.clone(),
                holders: vec![holder.clone()],
                direction: None,
            })
            .chain(self.sections.iter().map(|(id, lock)| ReservationListing {
                kind: ResourceKind::Section,
                resource_id: id.clone(),
                holders: lock.holders.keys().cloned().collect(),
                direction: Some(lock.direction),
            }))
            .chain(self.nodes.iter().map(|(id, holder)| ReservationListing {
                kind: ResourceKind::Node,
                resource_id: id.clone(),
                holders: vec![holder.clone()],
                direction: None,
            }))
            .collect();
        rows.sort_by(|a, b| (a.kind, &a.resource_id).cmp(&(b.kind, &b.resource_id)));
        rows
    }
}
