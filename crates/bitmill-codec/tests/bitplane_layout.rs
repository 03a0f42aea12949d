//! Layout conformance tests for the bitplane codec.
//!
//! These pin the packed word layout itself, not just the round-trip: bit
//! `j` of row `i` must land at bit `j % w` of word `j / w`, planes LSB
//! first, padding always zero. The external driver copies these buffers
//! verbatim into device memory, so the layout is load-bearing.

use bitmill_codec::{BitplaneCodec, CodecError, Matrix, PackedMatrix, Signedness};
use bitmill_layout::word::{WordSize, ALL_WORD_SIZES};

/// Deterministic value pattern covering the full signed range of a depth.
fn pattern(rows: usize, cols: usize, bit_depth: usize) -> Matrix {
    let lo = Signedness::Signed.min_value(bit_depth);
    let hi = Signedness::Signed.max_value(bit_depth);
    let span = hi - lo + 1;
    let values: Vec<i64> = (0..rows * cols)
        .map(|i| lo + (i as i64 * 7 + 3).rem_euclid(span))
        .collect();
    Matrix::from_values(rows, cols, bit_depth, Signedness::Signed, values).unwrap()
}

#[test]
fn every_bit_matches_the_direct_formula() {
    for &word in &ALL_WORD_SIZES {
        let codec = BitplaneCodec::new(word);
        let m = pattern(3, 2 * word.bits() + 3, 6);
        let packed = codec.pack(&m).unwrap();
        for d in 0..6 {
            for i in 0..m.rows() {
                for j in 0..m.cols() {
                    let expected = ((m.get(i, j) >> d) & 1) as u64;
                    assert_eq!(
                        packed.bit(d, i, j),
                        expected,
                        "word {word}, plane {d}, element ({i},{j})"
                    );
                }
            }
        }
    }
}

#[test]
fn roundtrip_at_word_boundaries() {
    // cols one below, at, and one above a word boundary
    for cols in [63, 64, 65] {
        let codec = BitplaneCodec::new(WordSize::W64);
        let m = pattern(4, cols, 8);
        let packed = codec.pack(&m).unwrap();
        assert_eq!(codec.unpack(&packed), m, "cols = {cols}");
    }
}

#[test]
fn roundtrip_every_word_size() {
    for &word in &ALL_WORD_SIZES {
        let codec = BitplaneCodec::new(word);
        let m = pattern(5, 17, 7);
        let packed = codec.pack(&m).unwrap();
        assert_eq!(codec.unpack(&packed), m, "word = {word}");
    }
}

#[test]
fn plane_order_is_lsb_first() {
    // 6 = 0b110: planes 1 and 2 set, plane 0 clear
    let codec = BitplaneCodec::new(WordSize::W64);
    let m = Matrix::from_values(1, 1, 4, Signedness::Signed, vec![6]).unwrap();
    let packed = codec.pack(&m).unwrap();
    let g = packed.geometry();
    assert_eq!(packed.words()[g.word_index(0, 0, 0)], 0);
    assert_eq!(packed.words()[g.word_index(1, 0, 0)], 1);
    assert_eq!(packed.words()[g.word_index(2, 0, 0)], 1);
    assert_eq!(packed.words()[g.word_index(3, 0, 0)], 0);
}

#[test]
fn wire_roundtrip_across_word_sizes() {
    for &word in &ALL_WORD_SIZES {
        let codec = BitplaneCodec::new(word);
        let m = pattern(3, word.bits() + 5, 5);
        let packed = codec.pack(&m).unwrap();
        let wire = packed.wire_bytes();
        assert_eq!(wire.len(), packed.geometry().wire_bytes());
        let back = PackedMatrix::from_wire_bytes(packed.geometry(), m.signedness(), &wire).unwrap();
        assert_eq!(back, packed, "word = {word}");
        assert_eq!(codec.unpack(&back), m);
    }
}

#[test]
fn wire_buffer_from_the_wrong_geometry_is_rejected() {
    let codec = BitplaneCodec::new(WordSize::W16);
    let m = pattern(2, 20, 3);
    let wire = codec.pack(&m).unwrap().wire_bytes();
    // 40 cols needs 3 words per row, so the byte count no longer matches
    let other = pattern(2, 40, 3).geometry(WordSize::W16);
    assert!(matches!(
        PackedMatrix::from_wire_bytes(other, Signedness::Signed, &wire),
        Err(CodecError::Wire { .. })
    ));
}

#[test]
fn single_column_matrix_packs_one_word_per_row() {
    let codec = BitplaneCodec::new(WordSize::W64);
    let m = Matrix::from_values(3, 1, 2, Signedness::Signed, vec![-1, 0, 1]).unwrap();
    let packed = codec.pack(&m).unwrap();
    assert_eq!(packed.geometry().words_per_row(), 1);
    assert_eq!(packed.words().len(), 6);
    assert_eq!(codec.unpack(&packed), m);
}
