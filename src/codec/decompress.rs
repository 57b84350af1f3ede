use crate::dictionary::Dictionary;

use super::THRESHOLD;

/// Result of a single [`decompress`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecompressOutcome {
    /// How many compressed bytes of `input` were consumed.
    pub input_consumed: usize,
    /// How many decompressed bytes were written to the destination.
    pub output_len: usize,
}

/// Decompress as much of `input` as fits within `output` and within `packet_remaining`
/// compressed bytes still owed to the current packet, appending every materialized byte to
/// `dict` in lockstep with the compressor.
///
/// Never consumes a partial record: a two-byte record whose second byte has not yet
/// arrived, or a record that would overflow `output`, is left unconsumed for the next call.
/// Two consecutive `0xFF` bytes are always treated as packet filler, even in the rare case
/// where they happen to be the true encoding of a maximum-length copy anchored at the last
/// dictionary slot; that collision is an accepted property of this wire format, not a bug
/// to route around here.
pub fn decompress(
    dict: &mut Dictionary,
    input: &[u8],
    output: &mut [u8],
    packet_remaining: usize,
) -> DecompressOutcome {
    let mut pos = 0;
    let mut written = 0;
    let mut budget = packet_remaining.min(input.len());

    while budget > 0 {
        let remaining_in_packet = budget;
        let byte1 = input[pos];

        if byte1 == 0xFF && remaining_in_packet >= 2 && input[pos + 1] == 0xFF {
            pos += 2;
            budget -= 2;
            continue;
        }

        if byte1 < 0x80 {
            if written >= output.len() {
                break;
            }
            output[written] = byte1;
            written += 1;
            dict.append(&input[pos..pos + 1]);
            pos += 1;
            budget -= 1;
            continue;
        }

        // byte1 has the high bit set: either a copy, a non-ASCII literal escape, or
        // packet filler if this is the last byte owed to the packet.
        if remaining_in_packet == 1 {
            // packet filler: consume it and stop, there is nothing more in this packet
            pos += 1;
            budget = 0;
            break;
        }

        let byte2 = input[pos + 1];

        if byte2 == super::ESCAPE_MARKER {
            if written >= output.len() {
                break;
            }
            output[written] = byte1;
            written += 1;
            dict.append(&input[pos..pos + 1]);
            pos += 2;
            budget -= 2;
            continue;
        }

        let length_field = byte2 & 0x0F;
        let position = (((byte1 & 0x7F) as usize) << 4) | ((byte2 >> 4) as usize);
        let len = length_field as usize + THRESHOLD;

        if written + len > output.len() {
            break;
        }
        let mut materialized = Vec::with_capacity(len);
        dict.copy_to_output(position, len, &mut materialized);
        output[written..written + len].copy_from_slice(&materialized);
        written += len;
        pos += 2;
        budget -= 2;
    }

    DecompressOutcome {
        input_consumed: pos,
        output_len: written,
    }
}
