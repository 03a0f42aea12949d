//! Packed bitplane containers.
//!
//! These are the buffers the external driver DMAs to the accelerator. The
//! in-memory word layout here **is** the wire format, serialized word by
//! word as little-endian bytes at the port width. Three container shapes:
//!
//! | Container | Plane order | Row layout |
//! |-----------|-------------|------------|
//! | [`PackedMatrix`] | plane-major, LSB first | matrix row, padded to words |
//! | [`PackedImage`] | channel-major, then plane | image row, padded to words |
//! | [`PackedFilters`] | plane-major, then output channel | per-input-channel `window²` patch, each padded to words |
//!
//! Words only ever have bits OR'd in after zero-initialization, so padding
//! bits are zero by construction; the wire parser re-checks that on the way
//! back in.

use crate::error::{CodecError, Result};
use crate::matrix::Signedness;
use bitmill_layout::geometry::PlaneGeometry;
use bitmill_layout::word::WordSize;
use bytes::Bytes;

/// One bitplane-packed matrix, plane 0 = LSB, top plane = sign carrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedMatrix {
    geometry: PlaneGeometry,
    signedness: Signedness,
    words: Vec<u64>,
}

impl PackedMatrix {
    pub(crate) fn zeroed(geometry: PlaneGeometry, signedness: Signedness) -> Self {
        Self {
            geometry,
            signedness,
            words: vec![0; geometry.total_words()],
        }
    }

    /// Layout of this buffer.
    pub fn geometry(&self) -> PlaneGeometry {
        self.geometry
    }

    /// Top-plane interpretation the values were packed under.
    pub fn signedness(&self) -> Signedness {
        self.signedness
    }

    /// All words, plane-major.
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub(crate) fn or_bit(&mut self, plane: usize, row: usize, col: usize, bit: u64) {
        let idx = self.geometry.word_index(plane, row, col);
        self.words[idx] |= bit << self.geometry.bit_offset(col);
    }

    /// Bit of element `(row, col)` in `plane`, as 0 or 1.
    ///
    /// # Panics
    ///
    /// Panics if any index is outside the geometry.
    pub fn bit(&self, plane: usize, row: usize, col: usize) -> u64 {
        let g = &self.geometry;
        assert!(
            plane < g.bit_depth() && row < g.rows() && col < g.cols(),
            "bit ({plane},{row},{col}) out of {}x{}x{}",
            g.bit_depth(),
            g.rows(),
            g.cols()
        );
        (self.words[g.word_index(plane, row, col)] >> g.bit_offset(col)) & 1
    }

    /// The padded words of one matrix row in one plane, the unit the dot
    /// engine ANDs against the other operand.
    ///
    /// # Panics
    ///
    /// Panics if `plane` or `row` is outside the geometry.
    pub fn row_words(&self, plane: usize, row: usize) -> &[u64] {
        let g = &self.geometry;
        assert!(plane < g.bit_depth() && row < g.rows());
        let wpr = g.words_per_row();
        let start = (plane * g.rows() + row) * wpr;
        &self.words[start..start + wpr]
    }

    /// Serialize to the device wire format: words in buffer order, each as
    /// `word_size.bytes()` little-endian bytes.
    pub fn wire_bytes(&self) -> Bytes {
        words_to_wire(&self.words, self.geometry.word_size())
    }

    /// Parse a wire buffer back into a packed matrix.
    ///
    /// # Errors
    ///
    /// Returns a wire error if the buffer length does not match the
    /// geometry or any row's padding bits are set.
    pub fn from_wire_bytes(geometry: PlaneGeometry, signedness: Signedness, data: &[u8]) -> Result<Self> {
        let words = words_from_wire(data, geometry.total_words(), geometry.word_size())?;
        check_row_padding(&words, &geometry)?;
        Ok(Self { geometry, signedness, words })
    }
}

/// Packed multi-channel image: channel-major, then plane, then row.
///
/// Plane `(c, d)` of the image sits at plane slot `c * bit_depth + d`, so
/// each channel's planes stay contiguous the way the accelerator fetches
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedImage {
    height: usize,
    width: usize,
    channels: usize,
    bit_depth: usize,
    word_size: WordSize,
    signedness: Signedness,
    words: Vec<u64>,
}

impl PackedImage {
    pub(crate) fn zeroed(
        height: usize,
        width: usize,
        channels: usize,
        bit_depth: usize,
        word_size: WordSize,
        signedness: Signedness,
    ) -> Self {
        let words_per_row = word_size.words_for_bits(width);
        Self {
            height,
            width,
            channels,
            bit_depth,
            word_size,
            signedness,
            words: vec![0; channels * bit_depth * height * words_per_row],
        }
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Channel count.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Plane count per channel.
    pub fn bit_depth(&self) -> usize {
        self.bit_depth
    }

    /// Port width the buffer is packed for.
    pub fn word_size(&self) -> WordSize {
        self.word_size
    }

    /// Top-plane interpretation the values were packed under.
    pub fn signedness(&self) -> Signedness {
        self.signedness
    }

    /// All words, channel-major.
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Words per padded image row.
    pub fn words_per_row(&self) -> usize {
        self.word_size.words_for_bits(self.width)
    }

    fn row_start(&self, c: usize, d: usize, y: usize) -> usize {
        ((c * self.bit_depth + d) * self.height + y) * self.words_per_row()
    }

    pub(crate) fn or_bit(&mut self, c: usize, d: usize, y: usize, x: usize, bit: u64) {
        let idx = self.row_start(c, d, y) + x / self.word_size.bits();
        self.words[idx] |= bit << (x % self.word_size.bits());
    }

    /// Bit of channel `c`, plane `d`, pixel `(y, x)`, as 0 or 1.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    pub fn bit(&self, c: usize, d: usize, y: usize, x: usize) -> u64 {
        assert!(
            c < self.channels && d < self.bit_depth && y < self.height && x < self.width,
            "bit ({c},{d},{y},{x}) out of {}x{}x{}x{}",
            self.channels,
            self.bit_depth,
            self.height,
            self.width
        );
        let word = self.words[self.row_start(c, d, y) + x / self.word_size.bits()];
        (word >> (x % self.word_size.bits())) & 1
    }

    /// The padded words of one image row in one channel plane.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    pub fn row_words(&self, c: usize, d: usize, y: usize) -> &[u64] {
        assert!(c < self.channels && d < self.bit_depth && y < self.height);
        let start = self.row_start(c, d, y);
        &self.words[start..start + self.words_per_row()]
    }

    /// Serialize to the device wire format.
    pub fn wire_bytes(&self) -> Bytes {
        words_to_wire(&self.words, self.word_size)
    }
}

/// Packed filter bank: plane-major, then output channel, then input channel.
///
/// Each input channel's `window × window` taps pack into their own padded
/// word run, bit `(i, j)` at patch bit `i * window + j`. One `(plane, co)`
/// row therefore spans `in_channels * patch_words` words and ANDs directly
/// against an extracted window row of the same shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedFilters {
    out_channels: usize,
    in_channels: usize,
    window: usize,
    bit_depth: usize,
    word_size: WordSize,
    signedness: Signedness,
    words: Vec<u64>,
}

impl PackedFilters {
    pub(crate) fn zeroed(
        out_channels: usize,
        in_channels: usize,
        window: usize,
        bit_depth: usize,
        word_size: WordSize,
        signedness: Signedness,
    ) -> Self {
        let patch_words = word_size.words_for_bits(window * window);
        Self {
            out_channels,
            in_channels,
            window,
            bit_depth,
            word_size,
            signedness,
            words: vec![0; bit_depth * out_channels * in_channels * patch_words],
        }
    }

    /// Output channel count.
    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// Input channel count.
    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    /// Filter edge length in pixels.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Plane count.
    pub fn bit_depth(&self) -> usize {
        self.bit_depth
    }

    /// Port width the buffer is packed for.
    pub fn word_size(&self) -> WordSize {
        self.word_size
    }

    /// Top-plane interpretation the taps were packed under.
    pub fn signedness(&self) -> Signedness {
        self.signedness
    }

    /// All words, plane-major.
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Words per single-channel tap patch.
    pub fn patch_words(&self) -> usize {
        self.word_size.words_for_bits(self.window * self.window)
    }

    fn row_start(&self, d: usize, co: usize) -> usize {
        (d * self.out_channels + co) * self.in_channels * self.patch_words()
    }

    pub(crate) fn or_bit(&mut self, d: usize, co: usize, ci: usize, i: usize, j: usize, bit: u64) {
        let patch_bit = i * self.window + j;
        let idx = self.row_start(d, co)
            + ci * self.patch_words()
            + patch_bit / self.word_size.bits();
        self.words[idx] |= bit << (patch_bit % self.word_size.bits());
    }

    /// Bit of tap `(i, j)` of filter `(co, ci)` in plane `d`, as 0 or 1.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    pub fn bit(&self, d: usize, co: usize, ci: usize, i: usize, j: usize) -> u64 {
        assert!(
            d < self.bit_depth
                && co < self.out_channels
                && ci < self.in_channels
                && i < self.window
                && j < self.window,
            "bit ({d},{co},{ci},{i},{j}) out of range"
        );
        let patch_bit = i * self.window + j;
        let word = self.words[self.row_start(d, co)
            + ci * self.patch_words()
            + patch_bit / self.word_size.bits()];
        (word >> (patch_bit % self.word_size.bits())) & 1
    }

    /// All input-channel patches of filter `co` in plane `d`, the row the
    /// dot engine ANDs against an extracted window row.
    ///
    /// # Panics
    ///
    /// Panics if `d` or `co` is out of bounds.
    pub fn row_words(&self, d: usize, co: usize) -> &[u64] {
        assert!(d < self.bit_depth && co < self.out_channels);
        let start = self.row_start(d, co);
        &self.words[start..start + self.in_channels * self.patch_words()]
    }

    /// Serialize to the device wire format.
    pub fn wire_bytes(&self) -> Bytes {
        words_to_wire(&self.words, self.word_size)
    }
}

fn words_to_wire(words: &[u64], word_size: WordSize) -> Bytes {
    let granule = word_size.bytes();
    let mut buf = Vec::with_capacity(words.len() * granule);
    for &w in words {
        buf.extend_from_slice(&w.to_le_bytes()[..granule]);
    }
    Bytes::from(buf)
}

fn words_from_wire(data: &[u8], expected_words: usize, word_size: WordSize) -> Result<Vec<u64>> {
    let granule = word_size.bytes();
    let expected = expected_words * granule;
    if data.len() != expected {
        return Err(CodecError::wire(format!(
            "buffer is {} bytes, geometry needs {expected} ({expected_words} words of {granule} bytes)",
            data.len()
        )));
    }
    let mut words = Vec::with_capacity(expected_words);
    for chunk in data.chunks_exact(granule) {
        let mut le = [0u8; 8];
        le[..granule].copy_from_slice(chunk);
        words.push(u64::from_le_bytes(le));
    }
    Ok(words)
}

fn check_row_padding(words: &[u64], geometry: &PlaneGeometry) -> Result<()> {
    let padding = geometry.padding_bits();
    if padding == 0 {
        return Ok(());
    }
    let wpr = geometry.words_per_row();
    let valid_bits = geometry.word_size().bits() - padding;
    let mask = (1u64 << valid_bits) - 1;
    for (row_idx, row) in words.chunks_exact(wpr).enumerate() {
        let last = row[wpr - 1];
        if last & !mask != 0 {
            return Err(CodecError::wire(format!(
                "padding bits set in padded row {row_idx} (word {last:#x}, {valid_bits} valid bits)"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_geometry() -> PlaneGeometry {
        PlaneGeometry::new(2, 10, 3, WordSize::W8)
    }

    #[test]
    fn or_bit_lands_where_the_geometry_says() {
        let mut p = PackedMatrix::zeroed(small_geometry(), Signedness::Signed);
        p.or_bit(2, 1, 9, 1);
        assert_eq!(p.bit(2, 1, 9), 1);
        assert_eq!(p.bit(2, 1, 8), 0);
        // plane 2, row 1, second word of the row, bit 1
        let idx = small_geometry().word_index(2, 1, 9);
        assert_eq!(p.words()[idx], 0b10);
    }

    #[test]
    fn wire_roundtrip_preserves_words() {
        let mut p = PackedMatrix::zeroed(small_geometry(), Signedness::Signed);
        p.or_bit(0, 0, 0, 1);
        p.or_bit(1, 1, 7, 1);
        p.or_bit(2, 0, 9, 1);
        let wire = p.wire_bytes();
        assert_eq!(wire.len(), small_geometry().wire_bytes());
        let back = PackedMatrix::from_wire_bytes(small_geometry(), Signedness::Signed, &wire).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn wire_rejects_wrong_length() {
        let p = PackedMatrix::zeroed(small_geometry(), Signedness::Signed);
        let wire = p.wire_bytes();
        let err = PackedMatrix::from_wire_bytes(small_geometry(), Signedness::Signed, &wire[..wire.len() - 1]);
        assert!(matches!(err, Err(CodecError::Wire { .. })));
    }

    #[test]
    fn wire_rejects_dirty_padding() {
        let g = small_geometry();
        let p = PackedMatrix::zeroed(g, Signedness::Signed);
        let mut wire = p.wire_bytes().to_vec();
        // second word of row 0 holds cols 8..10 in its low 2 bits; bit 5 is padding
        wire[1] |= 1 << 5;
        let err = PackedMatrix::from_wire_bytes(g, Signedness::Signed, &wire);
        assert!(matches!(err, Err(CodecError::Wire { .. })));
    }

    #[test]
    fn wire_words_are_little_endian_at_the_port_granule() {
        let g = PlaneGeometry::new(1, 16, 1, WordSize::W16);
        let mut p = PackedMatrix::zeroed(g, Signedness::Unsigned);
        p.or_bit(0, 0, 8, 1); // bit 8 -> second byte, bit 0
        let wire = p.wire_bytes();
        assert_eq!(&wire[..], &[0x00, 0x01]);
    }

    #[test]
    fn image_plane_slots_are_channel_major() {
        let mut img = PackedImage::zeroed(2, 4, 2, 3, WordSize::W8, Signedness::Signed);
        img.or_bit(1, 2, 0, 3, 1);
        assert_eq!(img.bit(1, 2, 0, 3), 1);
        // channel 1, plane 2 -> slot 5; row 0 starts at word 5*2 = 10
        assert_eq!(img.words()[10], 0b1000);
        assert_eq!(img.row_words(1, 2, 0), &[0b1000]);
    }

    #[test]
    fn filter_rows_concatenate_channel_patches() {
        let mut f = PackedFilters::zeroed(2, 3, 3, 2, WordSize::W8, Signedness::Signed);
        assert_eq!(f.patch_words(), 2); // 9 bits at w8
        f.or_bit(1, 0, 2, 1, 1, 1); // patch bit 4 of channel 2
        assert_eq!(f.bit(1, 0, 2, 1, 1), 1);
        let row = f.row_words(1, 0);
        assert_eq!(row.len(), 6);
        assert_eq!(row[4], 0b1_0000);
    }
}
