mod lifecycle;
mod locking;
