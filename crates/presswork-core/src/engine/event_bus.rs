//! Event bus for inter-service communication.
//!
//! A thin wrapper over a tokio broadcast channel. Publishing is fire and
//! forget: events announce facts after commit and are never load-bearing for
//! the operation that produced them, so subscribers that lag simply drop
//! events without affecting anything upstream.

use presswork_types::CoreEvent;
use tokio::sync::broadcast;

/// Broadcast bus carrying [`CoreEvent`] values to every subscriber.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
	/// Creates a bus with the given channel capacity.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event to all current subscribers.
	///
	/// Errors only when nobody is subscribed; call sites treat that as
	/// harmless and discard the result with `.ok()`.
	pub fn publish(
		&self,
		event: CoreEvent,
	) -> Result<usize, broadcast::error::SendError<CoreEvent>> {
		self.sender.send(event)
	}

	/// Creates a new subscription to the bus.
	pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
		self.sender.subscribe()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use presswork_types::OrderEvent;

	fn created(order_id: &str) -> CoreEvent {
		CoreEvent::Order(OrderEvent::Created {
			order_id: order_id.into(),
			order_number: "SAP25080001".into(),
			customer_id: "c1".into(),
		})
	}

	#[tokio::test]
	async fn publish_reaches_every_subscriber() {
		let bus = EventBus::new(8);
		let mut first = bus.subscribe();
		let mut second = bus.subscribe();

		bus.publish(created("o1")).unwrap();

		for rx in [&mut first, &mut second] {
			match rx.recv().await.unwrap() {
				CoreEvent::Order(OrderEvent::Created { order_id, .. }) => {
					assert_eq!(order_id, "o1");
				},
				other => panic!("unexpected event: {:?}", other),
			}
		}
	}

	#[tokio::test]
	async fn publish_without_subscribers_is_not_fatal() {
		let bus = EventBus::new(8);
		// No receiver exists, so send reports an error; producers ignore it.
		assert!(bus.publish(created("o1")).is_err());
	}
}
