mod callbacks;
mod engine;
mod packet_queue;
mod queue_monitor;
mod receive_loop;

pub use callbacks::CallbackSubscription;
pub use engine::{ActiveFlag, ProtocolEngine, RoleHandlers};
pub(crate) use engine::send_control;
pub use packet_queue::PacketQueue;
pub use queue_monitor::QueueMonitor;
pub use receive_loop::ReceiveLoop;
