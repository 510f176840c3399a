use std::collections::HashMap;

use time::OffsetDateTime;
use tracing::warn;

use crate::aggregator::Aggregator;
use crate::decode::{
    AttitudeDecoder, DecodeError, Decoder, GlobalPositionIntDecoder, GpsRawIntDecoder,
    HeartbeatDecoder, RcChannelsDecoder, SysStatusDecoder, VfrHudDecoder,
};
use crate::frame::Frame;
use crate::state::VehicleUpdate;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("a decoder for message id {0} is already registered")]
    Duplicate(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Decoded and applied to the aggregator.
    Applied,
    /// No decoder registered for this message id.
    Ignored,
    /// Decoder rejected the frame; nothing was applied.
    Dropped(DecodeError),
}

/// Routes frames to the decoder that owns their message id.
#[derive(Default)]
pub struct Registry {
    decoders: HashMap<u32, Box<dyn Decoder>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every decoder this crate ships.
    pub fn with_builtin_decoders() -> Result<Self, RegistrationError> {
        let mut reg = Self::new();
        reg.register(HeartbeatDecoder)?;
        reg.register(SysStatusDecoder)?;
        reg.register(GpsRawIntDecoder)?;
        reg.register(AttitudeDecoder)?;
        reg.register(GlobalPositionIntDecoder)?;
        reg.register(RcChannelsDecoder)?;
        reg.register(VfrHudDecoder)?;
        Ok(reg)
    }

    pub fn register<D: Decoder + 'static>(&mut self, decoder: D) -> Result<(), RegistrationError> {
        let id = decoder.message_id();
        if self.decoders.contains_key(&id) {
            return Err(RegistrationError::Duplicate(id));
        }
        self.decoders.insert(id, Box::new(decoder));
        Ok(())
    }

    /// Decode `frame` and hand the result to `aggregator`. Decode failures
    /// are logged and only cost this one frame.
    pub fn dispatch(&self, frame: &Frame, aggregator: &Aggregator) -> DispatchOutcome {
        self.dispatch_with(frame, |update| {
            aggregator.apply(update);
        })
    }

    /// Like [`Registry::dispatch`], but the decoded update goes to `apply`
    /// so the caller can publish other updates around it.
    pub fn dispatch_with(&self, frame: &Frame, apply: impl FnOnce(VehicleUpdate)) -> DispatchOutcome {
        let Some(decoder) = self.decoders.get(&frame.message_id) else {
            return DispatchOutcome::Ignored;
        };
        match decoder.decode(frame, OffsetDateTime::now_utc()) {
            Ok(update) => {
                apply(update);
                DispatchOutcome::Applied
            }
            Err(e) => {
                warn!("dropping frame: {}", e);
                DispatchOutcome::Dropped(e)
            }
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.decoders.keys().copied().collect();
        ids.sort_unstable();
        f.debug_struct("Registry").field("message_ids", &ids).finish()
    }
}
