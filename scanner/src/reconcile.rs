//! Capture-time dispatch and the offline reconcile loop.
//!
//! `capture_scan` is the single entry point for a scanned QR string: decode,
//! check the expiry snapshot, then either submit live or store an offline
//! intent. `reconcile` drains the stored intents through the same server
//! admission path once connectivity returns, so an offline check-in is
//! indistinguishable from a slow live one as far as the record store is
//! concerned.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::api::{CheckinApi, PinCheckinRequest, QrCheckinRequest};
use crate::error::{CaptureError, QueueError, ReplayError};
use crate::queue::OfflineQueue;

/// Pause between replay attempts so a reconnecting device does not burst
/// the server.
const REPLAY_GAP: Duration = Duration::from_millis(250);

/// What became of one scan or PIN entry handed to the kit.
#[derive(Debug, PartialEq)]
pub enum CaptureOutcome {
    /// The server accepted the check-in live.
    Recorded,
    /// The server already held a record; the student is checked in either
    /// way.
    AlreadyRecorded,
    /// No connectivity (or the live attempt died in transit); the scan is
    /// stored durably for the next reconcile run.
    Queued { local_id: u64 },
}

/// Tally of one reconcile run.
#[derive(Debug, Default, PartialEq)]
pub struct SyncReport {
    /// Intents the server accepted as new records.
    pub replayed: usize,
    /// Intents the server already had a record for.
    pub deduplicated: usize,
    /// Intents dropped without a record: stale snapshots, vanished or
    /// expired sessions, refusals.
    pub discarded: usize,
    /// Intents left queued after transport failures.
    pub kept: usize,
}

/// Owns the device's queue and API client and runs the capture/replay
/// policy over them.
pub struct Reconciler<A> {
    api: A,
    queue: OfflineQueue,
    replay_gap: Duration,
}

impl<A: CheckinApi> Reconciler<A> {
    pub fn new(api: A, queue: OfflineQueue) -> Self {
        Self::with_replay_gap(api, queue, REPLAY_GAP)
    }

    /// As [`Reconciler::new`] with the inter-attempt pause under caller
    /// control. Tests run with `Duration::ZERO`.
    pub fn with_replay_gap(api: A, queue: OfflineQueue, replay_gap: Duration) -> Self {
        Self {
            api,
            queue,
            replay_gap,
        }
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    /// Handles one scanned QR string.
    ///
    /// A payload whose expiry snapshot has already passed fails here without
    /// touching the network or the disk. Otherwise the connectivity probe
    /// picks the path: live submit when online, durable queue when not. A
    /// live submit that dies in transit falls back to the queue too, since
    /// from the device's side it is the same situation as never having been
    /// online.
    pub async fn capture_scan(
        &mut self,
        raw_payload: &str,
        now: DateTime<Utc>,
    ) -> Result<CaptureOutcome, CaptureError> {
        let payload = util::qr::decode(raw_payload)?;
        if now >= payload.expires_at {
            return Err(CaptureError::Replay(ReplayError::Expired));
        }

        if !self.api.is_online().await {
            let local_id =
                self.queue
                    .enqueue(payload.session_id, &payload.qr_token, now, payload.expires_at)?;
            tracing::info!(local_id, session_id = payload.session_id, "offline, queued scan");
            return Ok(CaptureOutcome::Queued { local_id });
        }

        let req = QrCheckinRequest {
            session_id: payload.session_id,
            qr_token: payload.qr_token.clone(),
            captured_at: None,
        };
        match self.api.submit_qr(&req).await {
            Ok(()) => Ok(CaptureOutcome::Recorded),
            Err(ReplayError::Duplicate) => Ok(CaptureOutcome::AlreadyRecorded),
            Err(ReplayError::Transport(reason)) => {
                let local_id = self.queue.enqueue(
                    payload.session_id,
                    &payload.qr_token,
                    now,
                    payload.expires_at,
                )?;
                tracing::warn!(local_id, %reason, "live submit failed in transit, queued scan");
                Ok(CaptureOutcome::Queued { local_id })
            }
            Err(verdict) => Err(CaptureError::Replay(verdict)),
        }
    }

    /// Submits a manually-entered PIN. PINs resolve against live server
    /// state only, so there is no offline fallback.
    pub async fn submit_pin(&self, pin_code: &str) -> Result<CaptureOutcome, CaptureError> {
        if !self.api.is_online().await {
            return Err(CaptureError::Replay(ReplayError::Transport(
                "device is offline".to_string(),
            )));
        }
        let req = PinCheckinRequest {
            pin_code: pin_code.to_owned(),
        };
        match self.api.submit_pin(&req).await {
            Ok(()) => Ok(CaptureOutcome::Recorded),
            Err(ReplayError::Duplicate) => Ok(CaptureOutcome::AlreadyRecorded),
            Err(verdict) => Err(CaptureError::Replay(verdict)),
        }
    }

    /// Walks the pending intents once, oldest first, replaying each with its
    /// original scan time attached.
    ///
    /// Per-intent verdicts: accepted and duplicate intents leave the queue
    /// (a duplicate means the record already exists, which is the point),
    /// vanished, expired and refused intents are discarded, and transport
    /// failures stay queued for a later run. Intents whose expiry snapshot
    /// has passed are discarded without a network call. A run without
    /// connectivity keeps everything.
    pub async fn reconcile(&mut self, now: DateTime<Utc>) -> Result<SyncReport, QueueError> {
        let mut report = SyncReport::default();

        if self.queue.is_empty() {
            return Ok(report);
        }
        if !self.api.is_online().await {
            report.kept = self.queue.len();
            return Ok(report);
        }

        let pending: Vec<_> = self.queue.pending().to_vec();
        let mut attempted = false;
        for intent in pending {
            if now >= intent.expires_at {
                self.queue.remove(intent.local_id)?;
                report.discarded += 1;
                tracing::info!(local_id = intent.local_id, "dropped stale offline intent");
                continue;
            }

            if attempted && !self.replay_gap.is_zero() {
                tokio::time::sleep(self.replay_gap).await;
            }
            attempted = true;

            let req = QrCheckinRequest {
                session_id: intent.session_id,
                qr_token: intent.qr_token.clone(),
                captured_at: Some(intent.scanned_at),
            };
            match self.api.submit_qr(&req).await {
                Ok(()) => {
                    self.queue.remove(intent.local_id)?;
                    report.replayed += 1;
                }
                Err(ReplayError::Duplicate) => {
                    self.queue.remove(intent.local_id)?;
                    report.deduplicated += 1;
                }
                Err(ReplayError::Transport(reason)) => {
                    tracing::warn!(
                        local_id = intent.local_id,
                        %reason,
                        "replay failed in transit, keeping intent"
                    );
                    report.kept += 1;
                }
                Err(verdict) => {
                    self.queue.remove(intent.local_id)?;
                    report.discarded += 1;
                    tracing::info!(
                        local_id = intent.local_id,
                        %verdict,
                        "server settled offline intent without a record"
                    );
                }
            }
        }
        Ok(report)
    }
}
