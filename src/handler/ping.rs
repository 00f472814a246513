use super::KommandHandler;
use crate::{
    kommand::{well_known::Pong, Kommand, KommandReader},
    serial::FrameSink,
    KommandId,
};

/// Answers every `Ping` with a `Pong` carrying the same echo id.
///
/// A `Ping` without an echo id is answered with id 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct PingHandler;

impl KommandHandler for PingHandler {
    fn try_handle(&mut self, mut kommand: KommandReader<'_>, reply: &mut dyn FrameSink) -> bool {
        if kommand.kommand_id() != Some(KommandId::Ping) {
            return false;
        }

        let pong = Pong {
            echo_id: kommand.read_u32(),
        };
        pong.to_writer().send(reply);
        true
    }
}
