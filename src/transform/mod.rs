//! Reversible per-byte rotation
//!
//! The transform is a bijection over the 256-value byte alphabet: forward
//! adds the rotation amount, reverse subtracts it, both modulo 256. A
//! forward/reverse pair constructed from the same amount is mutually
//! inverse for every byte.
//!
//! Arithmetic is unsigned 8-bit wraparound (`wrapping_add` /
//! `wrapping_sub`). Subtraction must never pass through a signed modulo,
//! which can leave negative intermediates outside [0,255].

/// Rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Reverse,
}

/// A stateless rotation over the byte alphabet.
///
/// Cheap to copy and safe to share across tasks; construction from an
/// explicit amount is the only lifecycle it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotN {
    amount: u8,
    direction: Direction,
}

impl RotN {
    /// Forward rotation: `b -> b + n (mod 256)`.
    pub fn forward(amount: u8) -> Self {
        Self {
            amount,
            direction: Direction::Forward,
        }
    }

    /// Reverse rotation: `b -> b - n (mod 256)`.
    pub fn reverse(amount: u8) -> Self {
        Self {
            amount,
            direction: Direction::Reverse,
        }
    }

    /// The rotation amount this transform was built from.
    pub fn amount(&self) -> u8 {
        self.amount
    }

    /// The transform that undoes this one.
    pub fn inverse(&self) -> Self {
        let direction = match self.direction {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        };
        Self {
            amount: self.amount,
            direction,
        }
    }

    /// Transform a single byte.
    #[inline]
    pub fn apply(&self, byte: u8) -> u8 {
        match self.direction {
            Direction::Forward => byte.wrapping_add(self.amount),
            Direction::Reverse => byte.wrapping_sub(self.amount),
        }
    }

    /// Transform a buffer in place. Order- and length-preserving.
    pub fn apply_in_place(&self, buf: &mut [u8]) {
        for byte in buf {
            *byte = self.apply(*byte);
        }
    }
}

/// The two transforms one relay role applies, one per direction.
///
/// The initiator and responder roles use mutually inverse pairs so the
/// stream is restored to its original form at the far hop, never
/// double-transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformPair {
    /// Applied to bytes flowing toward the negotiated destination.
    pub to_destination: RotN,
    /// Applied to bytes flowing back toward the inbound connection.
    pub from_destination: RotN,
}

impl TransformPair {
    /// Initiator (client) role: encode egress, decode ingress.
    pub fn initiator(amount: u8) -> Self {
        Self {
            to_destination: RotN::forward(amount),
            from_destination: RotN::reverse(amount),
        }
    }

    /// Responder (server) role: decode egress, encode ingress.
    pub fn responder(amount: u8) -> Self {
        Self {
            to_destination: RotN::reverse(amount),
            from_destination: RotN::forward(amount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_undoes_forward_for_all_bytes() {
        for amount in [0u8, 1, 13, 127, 128, 200, 255] {
            let forward = RotN::forward(amount);
            let reverse = RotN::reverse(amount);
            for byte in 0..=255u8 {
                assert_eq!(
                    reverse.apply(forward.apply(byte)),
                    byte,
                    "amount={} byte={}",
                    amount,
                    byte
                );
            }
        }
    }

    #[test]
    fn test_forward_is_a_bijection() {
        for amount in [1u8, 13, 128, 251] {
            let forward = RotN::forward(amount);
            let mut seen = [false; 256];
            for byte in 0..=255u8 {
                let out = forward.apply(byte) as usize;
                assert!(!seen[out], "amount={} collides at {}", amount, out);
                seen[out] = true;
            }
        }
    }

    #[test]
    fn test_rotation_by_one() {
        let forward = RotN::forward(1);
        let reverse = RotN::reverse(1);
        assert_eq!(forward.apply(0x47), 0x48);
        assert_eq!(reverse.apply(0x48), 0x47);
    }

    #[test]
    fn test_subtraction_wraps_below_zero() {
        // 0x05 - 200 would be negative under signed arithmetic.
        let reverse = RotN::reverse(200);
        assert_eq!(reverse.apply(0x05), 0x05u8.wrapping_sub(200));
        assert_eq!(RotN::forward(200).apply(reverse.apply(0x05)), 0x05);
    }

    #[test]
    fn test_inverse() {
        let forward = RotN::forward(42);
        assert_eq!(forward.inverse(), RotN::reverse(42));
        assert_eq!(forward.inverse().inverse(), forward);
    }

    #[test]
    fn test_apply_in_place_preserves_length_and_order() {
        let forward = RotN::forward(3);
        let mut buf = *b"stream";
        forward.apply_in_place(&mut buf);
        assert_eq!(buf.len(), 6);
        for (out, original) in buf.iter().zip(b"stream") {
            assert_eq!(*out, original.wrapping_add(3));
        }
    }

    #[test]
    fn test_role_pairs_restore_content_across_the_path() {
        let client = TransformPair::initiator(7);
        let server = TransformPair::responder(7);
        for byte in 0..=255u8 {
            // App -> client egress -> server egress -> upstream.
            let on_wire = client.to_destination.apply(byte);
            assert_eq!(server.to_destination.apply(on_wire), byte);
            // Upstream -> server ingress -> client ingress -> app.
            let back_on_wire = server.from_destination.apply(byte);
            assert_eq!(client.from_destination.apply(back_on_wire), byte);
        }
    }
}
