//! libmpv-backed engine. Gated behind the `mpv` cargo feature so the crate
//! builds and tests without system libmpv.

use libmpv2::events::{Event, PropertyData};
use libmpv2::{Format, Mpv};
use tracing::{debug, info, warn};

use super::{EndReason, EngineError, EngineEvent, MediaEngine, PropertyValue};
use crate::config::PlaybackConfig;

pub struct MpvEngine {
    mpv: Mpv,
}

impl MpvEngine {
    pub fn new(config: &PlaybackConfig) -> Result<Self, EngineError> {
        let verbose = config.mpv_verbose_logging;
        let cache_bytes = config.mpv_cache_size_mb as i64 * 1024 * 1024;
        let back_bytes = config.mpv_cache_backbuffer_mb as i64 * 1024 * 1024;
        let cache_secs = config.mpv_cache_secs as i64;

        info!(
            "Initializing mpv engine (cache: {}MB/{}s)",
            config.mpv_cache_size_mb, config.mpv_cache_secs
        );

        let mpv = Mpv::with_initializer(|init| {
            init.set_property("vo", "gpu")?;
            init.set_property("keep-open", "no")?;
            init.set_property("input-default-bindings", false)?;
            init.set_property("osc", false)?;
            init.set_property("demuxer-max-bytes", cache_bytes)?;
            init.set_property("demuxer-max-back-bytes", back_bytes)?;
            init.set_property("cache-secs", cache_secs)?;
            if verbose {
                init.set_property("msg-level", "all=v")?;
            }
            Ok(())
        })
        .map_err(|e| EngineError::command("initialize", e))?;

        Ok(Self { mpv })
    }

    fn map_end_reason(reason: u32) -> EndReason {
        // mpv end-file reasons: 0 eof, 2 stop, 3 quit, 4 error, 5 redirect
        match reason {
            0 => EndReason::Eof,
            4 => EndReason::Error,
            _ => EndReason::Stopped,
        }
    }
}

impl MediaEngine for MpvEngine {
    fn attach_window(&mut self, handle: i64) -> Result<(), EngineError> {
        debug!("Attaching mpv render surface to window {:#x}", handle);
        self.mpv
            .set_property("wid", handle)
            .map_err(|e| EngineError::property("wid", e))
    }

    fn command(&mut self, name: &str, args: &[&str]) -> Result<(), EngineError> {
        self.mpv
            .command(name, args)
            .map_err(|e| EngineError::command(name, e))
    }

    fn set_property_f64(&mut self, name: &str, value: f64) -> Result<(), EngineError> {
        self.mpv
            .set_property(name, value)
            .map_err(|e| EngineError::property(name, e))
    }

    fn set_property_i64(&mut self, name: &str, value: i64) -> Result<(), EngineError> {
        self.mpv
            .set_property(name, value)
            .map_err(|e| EngineError::property(name, e))
    }

    fn set_property_bool(&mut self, name: &str, value: bool) -> Result<(), EngineError> {
        self.mpv
            .set_property(name, value)
            .map_err(|e| EngineError::property(name, e))
    }

    fn set_property_str(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        self.mpv
            .set_property(name, value)
            .map_err(|e| EngineError::property(name, e))
    }

    fn get_property_f64(&mut self, name: &str) -> Result<f64, EngineError> {
        self.mpv
            .get_property::<f64>(name)
            .map_err(|e| EngineError::property(name, e))
    }

    fn get_property_i64(&mut self, name: &str) -> Result<i64, EngineError> {
        self.mpv
            .get_property::<i64>(name)
            .map_err(|e| EngineError::property(name, e))
    }

    fn get_property_bool(&mut self, name: &str) -> Result<bool, EngineError> {
        self.mpv
            .get_property::<bool>(name)
            .map_err(|e| EngineError::property(name, e))
    }

    fn get_property_str(&mut self, name: &str) -> Result<String, EngineError> {
        self.mpv
            .get_property::<String>(name)
            .map_err(|e| EngineError::property(name, e))
    }

    fn observe_property(&mut self, name: &str) -> Result<(), EngineError> {
        let format = match name {
            "pause" | "mute" => Format::Flag,
            _ => Format::Double,
        };
        self.mpv
            .event_context_mut()
            .observe_property(name, format, 0)
            .map_err(|e| EngineError::property(name, e))
    }

    fn poll_event(&mut self) -> Option<EngineEvent> {
        let event = self.mpv.event_context_mut().wait_event(0.0)?;
        match event {
            Ok(Event::PropertyChange { name, change, .. }) => {
                let value = match change {
                    PropertyData::Double(v) => PropertyValue::Double(v),
                    PropertyData::Flag(v) => PropertyValue::Flag(v),
                    PropertyData::Int64(v) => PropertyValue::Int(v),
                    PropertyData::Str(v) => PropertyValue::Text(v.to_string()),
                    _ => PropertyValue::Unavailable,
                };
                Some(EngineEvent::PropertyChanged {
                    name: name.to_string(),
                    value,
                })
            }
            Ok(Event::EndFile(reason)) => Some(EngineEvent::EndOfStream {
                reason: Self::map_end_reason(reason),
            }),
            Ok(Event::Shutdown) => Some(EngineEvent::Shutdown),
            Ok(_) => None,
            Err(e) => {
                warn!("mpv event decode failed: {}", e);
                None
            }
        }
    }
}
