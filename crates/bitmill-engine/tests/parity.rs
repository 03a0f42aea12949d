//! Packed-pipeline parity suite.
//!
//! The contract under test: the bit-serial path (pack, AND, popcount,
//! weighted accumulate) reproduces plain integer arithmetic exactly, for
//! every operand shape, depth, signedness, and port width the harness can
//! throw at it. These are the same checks the hardware sweep binaries run;
//! here they run against the reference engines only.

use bitmill_codec::{BitplaneCodec, Matrix, PackedMatrix, Signedness};
use bitmill_engine::source::{filters_from, image_from, matrix_from};
use bitmill_engine::{
    convolve, convolve_packed, multiply, multiply_direct, WindowExtractor, XoshiroSource,
};
use bitmill_layout::word::{WordSize, ALL_WORD_SIZES};

fn gemm_case(
    codec: BitplaneCodec,
    src: &mut XoshiroSource,
    rows: usize,
    inner: usize,
    cols: usize,
    lhs_depth: usize,
    rhs_depth: usize,
    lhs_sign: Signedness,
    rhs_sign: Signedness,
) {
    let a = matrix_from(src, rows, inner, lhs_depth, lhs_sign).unwrap();
    let b = matrix_from(src, inner, cols, rhs_depth, rhs_sign).unwrap();
    let expected = multiply_direct(&a, &b).unwrap();
    let got = multiply(
        &codec.pack(&a).unwrap(),
        &codec.pack_transposed(&b).unwrap(),
    )
    .unwrap();
    assert_eq!(
        got, expected,
        "{rows}x{inner}x{cols}, depths {lhs_depth}/{rhs_depth}, {lhs_sign}/{rhs_sign}, {}",
        codec.word_size()
    );
}

#[test]
fn gemm_matches_direct_across_shapes_and_depths() {
    let mut src = XoshiroSource::new(0xb17_9141);
    let codec = BitplaneCodec::new(WordSize::W64);
    for &(rows, inner, cols) in &[(1, 1, 1), (3, 3, 3), (2, 7, 5), (4, 64, 2), (1, 65, 4), (5, 17, 9)] {
        for &(da, dw) in &[(1, 1), (2, 5), (8, 8), (4, 8), (8, 3)] {
            gemm_case(codec, &mut src, rows, inner, cols, da, dw, Signedness::Signed, Signedness::Signed);
        }
    }
}

#[test]
fn gemm_matches_direct_for_every_signedness_pair() {
    let mut src = XoshiroSource::new(9001);
    let codec = BitplaneCodec::new(WordSize::W64);
    for &ls in &[Signedness::Signed, Signedness::Unsigned] {
        for &rs in &[Signedness::Signed, Signedness::Unsigned] {
            gemm_case(codec, &mut src, 3, 10, 4, 6, 6, ls, rs);
            gemm_case(codec, &mut src, 2, 33, 2, 4, 7, ls, rs);
        }
    }
}

#[test]
fn gemm_matches_direct_at_every_port_width() {
    let mut src = XoshiroSource::new(0xcafe);
    for &word in &ALL_WORD_SIZES {
        let codec = BitplaneCodec::new(word);
        gemm_case(codec, &mut src, 3, 21, 3, 5, 5, Signedness::Signed, Signedness::Signed);
    }
}

#[test]
fn worked_dot_product_scenario() {
    // W = [[-1,2,2];[-1,2,2];[-1,2,2]], a = [-1,2,2]:
    // each row dots to (-1)(-1) + 2*2 + 2*2 = 9
    let w = Matrix::from_values(
        3,
        3,
        8,
        Signedness::Signed,
        vec![-1, 2, 2, -1, 2, 2, -1, 2, 2],
    )
    .unwrap();
    let a = Matrix::from_values(3, 1, 8, Signedness::Signed, vec![-1, 2, 2]).unwrap();
    let codec = BitplaneCodec::new(WordSize::W64);
    let product = multiply(
        &codec.pack(&w).unwrap(),
        &codec.pack_transposed(&a).unwrap(),
    )
    .unwrap();
    assert_eq!(product.rows(), 3);
    assert_eq!(product.cols(), 1);
    assert_eq!(product.values(), &[9, 9, 9]);
}

#[test]
fn all_minus_one_operands_multiply_positive() {
    // -1 packs as all-ones across every plane; the MSBxMSB contribution
    // must come out positive or the sign correction is broken
    for depth in [1, 2, 4, 8] {
        let a = Matrix::from_values(2, 3, depth, Signedness::Signed, vec![-1; 6]).unwrap();
        let b = Matrix::from_values(3, 2, depth, Signedness::Signed, vec![-1; 6]).unwrap();
        let codec = BitplaneCodec::new(WordSize::W64);
        let product = multiply(
            &codec.pack(&a).unwrap(),
            &codec.pack_transposed(&b).unwrap(),
        )
        .unwrap();
        for &v in product.values() {
            assert_eq!(v, 3, "depth {depth}: (-1)*(-1) summed over K=3");
        }
    }
}

#[test]
fn single_sign_plane_boundary() {
    // depth 1 signed: the only plane is the MSB, values are 0 or -1
    let a = Matrix::from_values(2, 2, 1, Signedness::Signed, vec![-1, 0, -1, -1]).unwrap();
    let b = Matrix::from_values(2, 2, 1, Signedness::Signed, vec![-1, -1, 0, -1]).unwrap();
    let codec = BitplaneCodec::new(WordSize::W64);
    let expected = multiply_direct(&a, &b).unwrap();
    let got = multiply(
        &codec.pack(&a).unwrap(),
        &codec.pack_transposed(&b).unwrap(),
    )
    .unwrap();
    assert_eq!(got, expected);
    // spot check: row 0 = [-1,0] dot cols [-1,0] and [-1,-1]
    assert_eq!(got.get(0, 0), 1);
    assert_eq!(got.get(0, 1), 1);
}

#[test]
fn single_plane_unsigned_is_plain_binary_gemm() {
    // depth 1 unsigned: popcount of AND with no sign or significance at all
    let mut src = XoshiroSource::new(31337);
    let codec = BitplaneCodec::new(WordSize::W64);
    gemm_case(codec, &mut src, 4, 70, 4, 1, 1, Signedness::Unsigned, Signedness::Unsigned);
}

#[test]
fn wire_readback_multiplies_identically() {
    let mut src = XoshiroSource::new(555);
    let codec = BitplaneCodec::new(WordSize::W16);
    let a = matrix_from(&mut src, 3, 20, 6, Signedness::Signed).unwrap();
    let b = matrix_from(&mut src, 20, 3, 5, Signedness::Signed).unwrap();

    let lhs = codec.pack(&a).unwrap();
    let rhs = codec.pack_transposed(&b).unwrap();
    let lhs_back =
        PackedMatrix::from_wire_bytes(lhs.geometry(), lhs.signedness(), &lhs.wire_bytes()).unwrap();
    let rhs_back =
        PackedMatrix::from_wire_bytes(rhs.geometry(), rhs.signedness(), &rhs.wire_bytes()).unwrap();

    let product = multiply(&lhs_back, &rhs_back).unwrap();
    assert_eq!(product, multiply_direct(&a, &b).unwrap());
}

#[test]
fn convolution_packed_matches_direct_multichannel() {
    let mut src = XoshiroSource::new(0xfeed);
    let codec = BitplaneCodec::new(WordSize::W64);
    for &(h, w, c, co, win, stride) in &[
        (4, 4, 3, 2, 2, 2),
        (5, 7, 2, 3, 3, 2),
        (6, 6, 1, 1, 3, 1),
        (3, 3, 4, 2, 1, 1),
    ] {
        let img = image_from(&mut src, h, w, c, 5, Signedness::Signed).unwrap();
        let filters = filters_from(&mut src, co, c, win, 4, Signedness::Signed).unwrap();
        let direct = convolve(&img, &filters, stride).unwrap();
        let packed = convolve_packed(
            &codec.pack_image(&img).unwrap(),
            &codec.pack_filters(&filters).unwrap(),
            stride,
        )
        .unwrap();
        assert_eq!(packed, direct, "{h}x{w}x{c}, {co} out, win {win}, stride {stride}");
    }
}

#[test]
fn convolution_parity_with_unsigned_filters() {
    let mut src = XoshiroSource::new(777);
    let codec = BitplaneCodec::new(WordSize::W32);
    let img = image_from(&mut src, 5, 5, 2, 4, Signedness::Signed).unwrap();
    let filters = filters_from(&mut src, 2, 2, 3, 2, Signedness::Unsigned).unwrap();
    let direct = convolve(&img, &filters, 2).unwrap();
    let packed = convolve_packed(
        &codec.pack_image(&img).unwrap(),
        &codec.pack_filters(&filters).unwrap(),
        2,
    )
    .unwrap();
    assert_eq!(packed, direct);
}

#[test]
fn pixel_windows_at_unit_geometry_are_the_image() {
    let mut src = XoshiroSource::new(4242);
    let img = image_from(&mut src, 6, 5, 3, 7, Signedness::Signed).unwrap();
    let windows = WindowExtractor::new(1, 1).extract_pixels(&img).unwrap();
    assert_eq!(windows.values(), img.values());
}

#[test]
fn window_stack_dots_against_filters_like_the_direct_formula() {
    // one output channel, one window position: the stack row dotted with
    // the filter row is the whole convolution cell
    let mut src = XoshiroSource::new(10);
    let codec = BitplaneCodec::new(WordSize::W64);
    let img = image_from(&mut src, 3, 3, 2, 4, Signedness::Signed).unwrap();
    let filters = filters_from(&mut src, 1, 2, 3, 4, Signedness::Signed).unwrap();

    let fm = convolve(&img, &filters, 1).unwrap();
    let stack = WindowExtractor::new(3, 1)
        .extract_planes(&codec.pack_image(&img).unwrap())
        .unwrap();
    assert_eq!(stack.steps_y(), 1);
    assert_eq!(stack.steps_x(), 1);
    let packed = convolve_packed(
        &codec.pack_image(&img).unwrap(),
        &codec.pack_filters(&filters).unwrap(),
        1,
    )
    .unwrap();
    assert_eq!(packed.get(0, 0, 0), fm.get(0, 0, 0));
}
