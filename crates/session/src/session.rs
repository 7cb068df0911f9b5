//! One peer's view of a shared drawing scene

use std::collections::BTreeSet;
use std::sync::Arc;

use drawing::{
    ChunkKey, ChunkStorage, DrawingLayer, FillJob, FsChunkStorage, LayerId, LayerSelector, PixelBuffer, Point,
    RasterTask, Rgba, ScratchSurface, StoredLayer, StrokeId, StrokeStyle, WorkerPool, CHUNK_SIZE,
};
use futures_util::future::join_all;
use inkboard_config::DrawingConfig;
use inkboard_ipc::{self as ipc, ChunkPayload, DrawMessage};
use tracing::{debug, error, info, warn};

use crate::broadcast::{Broadcast, PeerId};
use crate::convert::{
    layer_from_wire, layer_to_wire, parse_chunk_key, selector_from_wire, selector_to_wire,
    stroke_from_wire, stroke_to_wire,
};
use crate::error::SessionError;
use crate::layer_state::{LayerPhase, LayerState};
use crate::logging;
use crate::persist_queue::PersistQueue;
use crate::previews::RemotePreviews;

fn slot(layer: LayerId) -> usize {
    match layer {
        LayerId::Restricted => 0,
        LayerId::Shared => 1,
    }
}

/// Both drawing layers of one peer in the current scene.
///
/// Turns local input into committed chunks and broadcasts, and applies
/// messages received from other peers. A session constructed with durable
/// storage acts as the host: it mirrors every committed chunk and answers
/// resync requests.
pub struct DrawingSession {
    config: DrawingConfig,
    peer: PeerId,
    scene: String,
    layers: [LayerState; 2],
    next_stroke: StrokeId,
    broadcaster: Arc<dyn Broadcast>,
    storage: Option<Arc<dyn ChunkStorage>>,
    persist: Option<PersistQueue>,
    pool: Arc<WorkerPool<RasterTask>>,
}

impl std::fmt::Debug for DrawingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawingSession")
            .field("peer", &self.peer)
            .field("scene", &self.scene)
            .field("host", &self.storage.is_some())
            .field("layers", &self.layers)
            .finish_non_exhaustive()
    }
}

impl DrawingSession {
    /// Create a session for `peer` in `scene`.
    ///
    /// Both layers start stale. Call [`load_from_storage`](Self::load_from_storage)
    /// on a host or [`request_resync`](Self::request_resync) on a client
    /// before drawing. Passing storage requires a running tokio runtime.
    pub fn new(
        config: DrawingConfig,
        peer: PeerId,
        scene: impl Into<String>,
        broadcaster: Arc<dyn Broadcast>,
        storage: Option<Arc<dyn ChunkStorage>>,
        pool: Arc<WorkerPool<RasterTask>>,
    ) -> Result<Self, SessionError> {
        let persist = storage.clone().map(PersistQueue::spawn).transpose()?;
        let scene = scene.into();
        info!(
            "peer {} joined scene {} ({})",
            peer,
            scene,
            if storage.is_some() { "host" } else { "client" }
        );

        Ok(Self {
            config,
            peer,
            scene,
            layers: [
                LayerState::new(LayerId::Restricted),
                LayerState::new(LayerId::Shared),
            ],
            next_stroke: 1,
            broadcaster,
            storage,
            persist,
            pool,
        })
    }

    /// Create a session from configuration alone.
    ///
    /// Installs logging with `config.log_filter` unless a subscriber already
    /// exists, spawns `config.worker_count()` workers, and becomes a host
    /// backed by [`FsChunkStorage`] when `config.storage_dir` is set.
    pub fn from_config(
        config: DrawingConfig,
        peer: PeerId,
        scene: impl Into<String>,
        broadcaster: Arc<dyn Broadcast>,
    ) -> Result<Self, SessionError> {
        logging::init(&config.log_filter);
        let pool = Arc::new(WorkerPool::new(config.worker_count())?);
        let storage = config
            .storage_dir
            .clone()
            .map(|dir| Arc::new(FsChunkStorage::new(dir)) as Arc<dyn ChunkStorage>);
        Self::new(config, peer, scene, broadcaster, storage, pool)
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn scene(&self) -> &str {
        &self.scene
    }

    pub fn is_host(&self) -> bool {
        self.storage.is_some()
    }

    pub fn config(&self) -> &DrawingConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<WorkerPool<RasterTask>> {
        &self.pool
    }

    pub fn layer(&self, layer: LayerId) -> &DrawingLayer {
        &self.layers[slot(layer)].layer
    }

    pub fn phase(&self, layer: LayerId) -> LayerPhase {
        self.layers[slot(layer)].phase
    }

    /// Preview of the local stroke in progress
    pub fn scratch(&self, layer: LayerId) -> &ScratchSurface {
        self.layers[slot(layer)].scratch()
    }

    pub fn remote_previews(&self, layer: LayerId) -> &RemotePreviews {
        &self.layers[slot(layer)].previews
    }

    // -- Local input --

    /// Start a stroke at `start`. Fails unless the layer is idle.
    pub fn begin_stroke(
        &mut self,
        layer: LayerId,
        style: StrokeStyle,
        start: Point,
    ) -> Result<StrokeId, SessionError> {
        let id = self.next_stroke;
        let state = &mut self.layers[slot(layer)];
        state.start_drawing()?;
        if let Err(e) = state.rasterizer.begin(state.layer.store_mut(), id, style, start) {
            state.stop_drawing();
            return Err(e.into());
        }
        self.next_stroke += 1;
        debug!("peer {} began stroke {} on {}", self.peer, id, layer);

        if !style.is_erase() {
            if let Some(stroke) = state.rasterizer.active() {
                let message = DrawMessage::StrokePreview {
                    scene: self.scene.clone(),
                    layer: layer_to_wire(layer),
                    stroke: stroke_to_wire(stroke),
                };
                self.broadcaster.broadcast(message, Some(self.peer));
            }
        }
        Ok(id)
    }

    /// Extend the stroke in progress
    pub fn continue_stroke(&mut self, layer: LayerId, point: Point) -> Result<(), SessionError> {
        let state = &mut self.layers[slot(layer)];
        state.ensure_drawing()?;
        state.rasterizer.continue_to(state.layer.store_mut(), point)?;

        let Some(stroke) = state.rasterizer.active() else {
            return Ok(());
        };
        if stroke.style.is_erase() {
            return Ok(());
        }
        state.unsent_points += 1;
        if state.unsent_points < self.config.preview_min_points.max(1) {
            return Ok(());
        }
        state.unsent_points = 0;

        let message = DrawMessage::StrokePreview {
            scene: self.scene.clone(),
            layer: layer_to_wire(layer),
            stroke: stroke_to_wire(stroke),
        };
        self.broadcaster.broadcast(message, Some(self.peer));
        Ok(())
    }

    /// Finish the stroke in progress and commit every chunk it touched.
    ///
    /// Returns the committed chunk keys.
    pub async fn end_stroke(&mut self, layer: LayerId) -> Result<BTreeSet<ChunkKey>, SessionError> {
        let state = &mut self.layers[slot(layer)];
        state.ensure_drawing()?;
        let committed = state.rasterizer.end(state.layer.store_mut());
        state.stop_drawing();
        let committed = committed?;

        debug!(
            "peer {} committed stroke {} across {} chunks",
            self.peer,
            committed.stroke.id,
            committed.touched.len()
        );
        self.commit_chunks(
            layer,
            committed.touched.iter().copied().collect(),
            Some(committed.stroke.id),
        )
        .await;
        Ok(committed.touched)
    }

    /// Abandon the stroke in progress without committing anything.
    ///
    /// An eraser stroke has already modified the layer locally; those chunks
    /// stay as they are until the next commit or resync.
    pub fn cancel_stroke(&mut self, layer: LayerId) {
        let state = &mut self.layers[slot(layer)];
        let cancelled = state.rasterizer.cancel();
        state.stop_drawing();
        if let Some(stroke) = cancelled {
            debug!("peer {} cancelled stroke {}", self.peer, stroke.id);
            if !stroke.style.is_erase() {
                self.end_remote_preview(layer, stroke.id);
            }
        }
    }

    /// Tell the other peers to drop their preview of a stroke that will
    /// never produce a chunk update
    fn end_remote_preview(&self, layer: LayerId, stroke_id: StrokeId) {
        self.broadcaster.broadcast(
            DrawMessage::StrokeCancel {
                scene: self.scene.clone(),
                layer: layer_to_wire(layer),
                stroke_id,
            },
            Some(self.peer),
        );
    }

    /// Drop the previews of a peer that left the scene
    pub fn peer_left(&mut self, peer: PeerId) {
        for state in &mut self.layers {
            let dropped = state.previews.forget_peer(peer);
            if dropped > 0 {
                debug!("dropped {} previews of departed peer {}", dropped, peer);
            }
        }
    }

    /// Flood fill the region containing world point `(x, y)` and commit the
    /// chunks it changed.
    pub async fn flood_fill(
        &mut self,
        layer: LayerId,
        x: f32,
        y: f32,
        color: Rgba,
    ) -> Result<Vec<ChunkKey>, SessionError> {
        let state = &self.layers[slot(layer)];
        match state.phase {
            LayerPhase::Idle => {}
            LayerPhase::Stale => return Err(SessionError::LayerStale(layer)),
            LayerPhase::Drawing => return Err(SessionError::StrokeInProgress(layer)),
        }

        let job = FillJob::from_store(state.layer.store(), x, y, color);
        let outcome = self.pool.flood_fill(job).await?;
        if outcome.is_empty() {
            debug!("fill at ({}, {}) on {} changed nothing", x, y, layer);
            return Ok(Vec::new());
        }

        let state = &mut self.layers[slot(layer)];
        outcome.apply(state.layer.store_mut());
        let keys: Vec<ChunkKey> = outcome.changed.iter().map(|(key, _)| *key).collect();
        info!(
            "filled {} pixels across {} chunks on {}",
            outcome.filled_pixels,
            keys.len(),
            layer
        );
        self.commit_chunks(layer, keys.clone(), None).await;
        Ok(keys)
    }

    /// Discard every chunk of the selected layers here and on every peer.
    ///
    /// Returns the version of the clear.
    pub fn clear(&mut self, selector: LayerSelector) -> u64 {
        let version = selector
            .layers()
            .iter()
            .map(|id| self.layers[slot(*id)].layer.next_version())
            .max()
            .unwrap_or_else(drawing::now_ms);
        self.clear_layers(selector, version, true);

        self.broadcaster.broadcast(
            DrawMessage::Clear {
                scene: self.scene.clone(),
                layers: selector_to_wire(selector),
                version,
            },
            Some(self.peer),
        );
        version
    }

    fn clear_layers(&mut self, selector: LayerSelector, version: u64, persist: bool) {
        for id in selector.layers() {
            let state = &mut self.layers[slot(*id)];
            state.layer.clear(version);
            state.previews.clear();
            if persist {
                if let Some(queue) = &self.persist {
                    queue.delete_layer(&self.scene, *id, version);
                }
            }
        }
        info!("cleared {:?} in {} at {}", selector, self.scene, version);
    }

    /// Encode, version, persist and broadcast the current contents of `keys`.
    ///
    /// Chunks absent from the store are sent as transparent so receivers drop
    /// them too. Encoding runs on the worker pool, one task per chunk.
    async fn commit_chunks(&mut self, layer: LayerId, keys: Vec<ChunkKey>, stroke_id: Option<StrokeId>) {
        if keys.is_empty() {
            if let Some(id) = stroke_id {
                self.end_remote_preview(layer, id);
            }
            return;
        }
        let state = &mut self.layers[slot(layer)];
        let version = state.layer.next_version();
        let snapshots: Vec<(ChunkKey, PixelBuffer)> = keys
            .into_iter()
            .map(|key| {
                let pixels = state
                    .layer
                    .store()
                    .snapshot(key)
                    .unwrap_or_else(|| PixelBuffer::new(CHUNK_SIZE, CHUNK_SIZE));
                (key, pixels)
            })
            .collect();

        let pool = &self.pool;
        let encoded = join_all(snapshots.into_iter().map(|(key, pixels)| async move {
            (key, pool.encode_png(key, pixels).await)
        }))
        .await;

        let state = &mut self.layers[slot(layer)];
        let mut sent = 0;
        for (key, result) in encoded {
            let bytes = match result {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!("failed to encode chunk {} on {}: {}", key, layer, e);
                    continue;
                }
            };

            let store = state.layer.store_mut();
            if store.get(key).is_some_and(PixelBuffer::is_transparent) {
                store.remove(key);
            }
            state.layer.record_commit([key], version);

            if let Some(queue) = &self.persist {
                queue.write(&self.scene, layer, key, bytes.clone(), version);
            }
            self.broadcaster.broadcast(
                DrawMessage::ChunkUpdate {
                    scene: self.scene.clone(),
                    layer: layer_to_wire(layer),
                    chunk: key.to_string(),
                    bytes,
                    version,
                    stroke_id,
                },
                None,
            );
            sent += 1;
        }

        if sent == 0 {
            if let Some(id) = stroke_id {
                self.end_remote_preview(layer, id);
            }
        }
    }

    // -- Inbound messages --

    /// Decode and handle one wire message. Returns the encoded reply for the
    /// sender, if the message calls for one.
    pub async fn handle_text(&mut self, from: PeerId, text: &str) -> Option<String> {
        let message = match ipc::decode_message(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("ignoring undecodable message from peer {}: {}", from, e);
                return None;
            }
        };
        let reply = self.handle_message(from, message).await?;
        match ipc::encode_message(&reply) {
            Ok(text) => Some(text),
            Err(e) => {
                error!("failed to encode {} reply: {}", reply.kind(), e);
                None
            }
        }
    }

    /// Handle one message, logging and ignoring anything that cannot be applied
    pub async fn handle_message(&mut self, from: PeerId, message: DrawMessage) -> Option<DrawMessage> {
        let kind = message.kind();
        match self.process_message(from, message).await {
            Ok(reply) => reply,
            Err(SessionError::ProtocolViolation(reason)) => {
                warn!("ignoring {} from peer {}: {}", kind, from, reason);
                None
            }
            Err(e) => {
                warn!("{} from peer {} not applied: {}", kind, from, e);
                None
            }
        }
    }

    /// Handle one message from `from`, which may be this peer's own echo.
    ///
    /// A resync request on a host yields the response to send back to the
    /// requester.
    pub async fn process_message(
        &mut self,
        from: PeerId,
        message: DrawMessage,
    ) -> Result<Option<DrawMessage>, SessionError> {
        if message.scene() != self.scene {
            debug!(
                "ignoring {} for scene {} while in {}",
                message.kind(),
                message.scene(),
                self.scene
            );
            return Ok(None);
        }

        match message {
            DrawMessage::StrokePreview { layer, stroke, .. } => {
                if from == self.peer {
                    return Ok(None);
                }
                let stroke = stroke_from_wire(&stroke, &self.config)?;
                if stroke.style.is_erase() {
                    return Err(SessionError::violation("erase strokes have no preview"));
                }
                self.layers[slot(layer_from_wire(layer))]
                    .previews
                    .update(from, stroke);
                Ok(None)
            }

            DrawMessage::StrokeCancel {
                layer, stroke_id, ..
            } => {
                if from != self.peer {
                    self.layers[slot(layer_from_wire(layer))]
                        .previews
                        .finish(from, stroke_id);
                }
                Ok(None)
            }

            DrawMessage::ChunkUpdate {
                layer,
                chunk,
                bytes,
                version,
                stroke_id,
                ..
            } => {
                let key = parse_chunk_key(&chunk, self.config.max_chunk_coord)?;
                let layer = layer_from_wire(layer);
                self.apply_chunk_update(from, layer, key, bytes, version, stroke_id)?;
                Ok(None)
            }

            DrawMessage::ResyncRequest { layer, .. } => {
                if from == self.peer || self.storage.is_none() {
                    return Ok(None);
                }
                let stored = self.load_layer(layer_from_wire(layer)).await?;
                debug!(
                    "answering resync of {:?} for peer {} with {} chunks",
                    layer,
                    from,
                    stored.chunks.len()
                );
                Ok(Some(DrawMessage::ResyncResponse {
                    scene: self.scene.clone(),
                    layer,
                    chunks: stored
                        .chunks
                        .into_iter()
                        .map(|(key, chunk)| ChunkPayload {
                            chunk: key.to_string(),
                            bytes: chunk.bytes,
                            version: chunk.version,
                        })
                        .collect(),
                    version: stored.version,
                }))
            }

            DrawMessage::ResyncResponse {
                layer,
                chunks,
                version,
                ..
            } => {
                if from == self.peer {
                    return Ok(None);
                }
                self.apply_resync_response(layer_from_wire(layer), chunks, version);
                Ok(None)
            }

            DrawMessage::Clear { layers, version, .. } => {
                // The sender already cleared locally; only a host mirrors it
                if from != self.peer {
                    self.clear_layers(selector_from_wire(layers), version, true);
                }
                Ok(None)
            }
        }
    }

    fn apply_chunk_update(
        &mut self,
        from: PeerId,
        layer: LayerId,
        key: ChunkKey,
        bytes: Vec<u8>,
        version: u64,
        stroke_id: Option<StrokeId>,
    ) -> Result<(), SessionError> {
        let state = &mut self.layers[slot(layer)];
        if let Some(id) = stroke_id {
            state.previews.finish(from, id);
        }
        // Own echo of a commit already applied locally
        if from == self.peer && state.layer.chunk_version(key) == Some(version) {
            return Ok(());
        }

        match state.layer.apply_update(key, &bytes, version)? {
            drawing::ApplyOutcome::Applied => {
                if from != self.peer {
                    if let Some(queue) = &self.persist {
                        queue.write(&self.scene, layer, key, bytes, version);
                    }
                }
            }
            drawing::ApplyOutcome::Stale => {
                debug!("update for {} on {} at {} is stale", key, layer, version);
            }
        }
        Ok(())
    }

    fn apply_resync_response(&mut self, layer: LayerId, chunks: Vec<ChunkPayload>, version: u64) {
        let bound = self.config.max_chunk_coord;
        let mut malformed = 0;
        let parsed: Vec<(ChunkKey, Vec<u8>, u64)> = chunks
            .into_iter()
            .filter_map(|payload| match parse_chunk_key(&payload.chunk, bound) {
                Ok(key) => Some((key, payload.bytes, payload.version)),
                Err(e) => {
                    warn!("skipping chunk in {} resync: {}", layer, e);
                    malformed += 1;
                    None
                }
            })
            .collect();

        let state = &mut self.layers[slot(layer)];
        let mut report = state.layer.apply_resync(
            parsed
                .iter()
                .map(|(key, bytes, chunk_version)| (*key, bytes.as_slice(), *chunk_version)),
            version,
        );
        report.malformed += malformed;
        state.mark_synced();
        info!(
            "resynced {} at {}: {} applied, {} stale, {} malformed",
            layer, version, report.applied, report.stale, report.malformed
        );
    }

    // -- Resync and scenes --

    /// Mark `layer` stale and ask the other peers for its full contents
    pub fn request_resync(&mut self, layer: LayerId) -> Result<(), SessionError> {
        let state = &mut self.layers[slot(layer)];
        if state.phase == LayerPhase::Drawing {
            return Err(SessionError::StrokeInProgress(layer));
        }
        state.phase = LayerPhase::Stale;
        self.broadcaster.broadcast(
            DrawMessage::ResyncRequest {
                scene: self.scene.clone(),
                layer: layer_to_wire(layer),
            },
            Some(self.peer),
        );
        Ok(())
    }

    /// Leave the current scene and start over in `scene`.
    ///
    /// All local content, strokes in progress and previews are discarded. A
    /// host reloads from storage; a client requests a resync of both layers.
    pub async fn switch_scene(&mut self, scene: impl Into<String>) -> Result<(), SessionError> {
        let scene = scene.into();
        info!("peer {} switching from {} to {}", self.peer, self.scene, scene);
        for state in &mut self.layers {
            state.reset();
        }
        self.scene = scene;

        if self.storage.is_some() {
            self.load_from_storage().await
        } else {
            for layer in LayerId::ALL {
                self.request_resync(layer)?;
            }
            Ok(())
        }
    }

    /// Replace both layers with what durable storage holds for this scene
    pub async fn load_from_storage(&mut self) -> Result<(), SessionError> {
        for layer in LayerId::ALL {
            let stored = self.load_layer(layer).await?;
            let state = &mut self.layers[slot(layer)];
            if state.phase == LayerPhase::Drawing {
                return Err(SessionError::StrokeInProgress(layer));
            }
            state.layer.reset();
            let report = state.layer.apply_resync(
                stored
                    .chunks
                    .iter()
                    .map(|(key, chunk)| (*key, chunk.bytes.as_slice(), chunk.version)),
                stored.version,
            );
            state.mark_synced();
            info!(
                "loaded {} chunks of {} from storage ({} malformed)",
                report.applied, layer, report.malformed
            );
        }
        Ok(())
    }

    /// Wait for every queued storage operation to land
    pub async fn flush_persistence(&self) {
        if let Some(queue) = &self.persist {
            queue.flush().await;
        }
    }

    async fn load_layer(&self, layer: LayerId) -> Result<StoredLayer, SessionError> {
        let storage = self.storage.clone().ok_or(SessionError::NoStorage)?;
        self.flush_persistence().await;
        let scene = self.scene.clone();
        let stored = tokio::task::spawn_blocking(move || storage.load_all(&scene, layer)).await??;
        Ok(stored)
    }
}
