mod codec;
mod redis_queue;

pub use codec::{decode, encode, Payload};
pub use redis_queue::{RedisQueue, ScopedQueue};
