//! An in-memory transport for tests and demos. Two paired ends share
//! queues; what one end sends, the other receives.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::{Transport, TransportError};

#[derive(Default)]
struct Shared {
    a_to_b: VecDeque<Vec<u8>>,
    b_to_a: VecDeque<Vec<u8>>,
    closed: bool,
}

/// One end of an in-memory duplex connection
pub struct MockTransport {
    shared: Rc<RefCell<Shared>>,
    is_a: bool,
}

impl MockTransport {
    /// Creates a connected pair of transports
    pub fn pair() -> (MockTransport, MockTransport) {
        let shared = Rc::new(RefCell::new(Shared::default()));
        (
            MockTransport {
                shared: shared.clone(),
                is_a: true,
            },
            MockTransport {
                shared,
                is_a: false,
            },
        )
    }

    /// Everything the peer has sent, drained in order
    pub fn drain_sent(&mut self) -> Vec<Vec<u8>> {
        let mut shared = self.shared.borrow_mut();
        let queue = if self.is_a {
            &mut shared.b_to_a
        } else {
            &mut shared.a_to_b
        };
        queue.drain(..).collect()
    }
}

impl Transport for MockTransport {
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let mut shared = self.shared.borrow_mut();
        if shared.closed {
            return Err(TransportError::Closed);
        }
        let queue = if self.is_a {
            &mut shared.a_to_b
        } else {
            &mut shared.b_to_a
        };
        queue.push_back(payload.to_vec());
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut shared = self.shared.borrow_mut();
        let queue = if self.is_a {
            &mut shared.b_to_a
        } else {
            &mut shared.a_to_b
        };
        if let Some(chunk) = queue.pop_front() {
            return Ok(Some(chunk));
        }
        if shared.closed {
            return Err(TransportError::Closed);
        }
        Ok(None)
    }

    fn close(&mut self) {
        self.shared.borrow_mut().closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paired_ends_exchange_chunks_in_order() {
        let (mut a, mut b) = MockTransport::pair();
        a.send(&[1, 2]).unwrap();
        a.send(&[3]).unwrap();
        assert_eq!(b.receive().unwrap(), Some(vec![1, 2]));
        assert_eq!(b.receive().unwrap(), Some(vec![3]));
        assert_eq!(b.receive().unwrap(), None);
    }

    #[test]
    fn close_drains_pending_then_errors() {
        let (mut a, mut b) = MockTransport::pair();
        a.send(&[9]).unwrap();
        a.close();
        assert_eq!(b.receive().unwrap(), Some(vec![9]));
        assert_eq!(b.receive(), Err(TransportError::Closed));
        assert_eq!(b.send(&[1]), Err(TransportError::Closed));
    }
}
