pub mod event_listener;

pub use event_listener::{
    EventListener, EventListenerSpec, EventListenerTrigger, TriggerParam,
    TriggerRef,
};
