use criterion::{criterion_group, criterion_main, Criterion};
use ride_checkin::models::{QrPayload, RiderNumber};
use ride_checkin::scanner::{GrayFrame, QrDecoder, RqrrDecoder};
use ride_checkin::services::TicketRenderer;
use std::hint::black_box;

fn benchmark_tickets(c: &mut Criterion) {
    let renderer = TicketRenderer::new(4);
    let payload = QrPayload::new("K7vQ2mXr9LpA", RiderNumber::Two);

    let mut group = c.benchmark_group("ticket_rendering");

    group.bench_function("render_qr", |b| {
        b.iter(|| renderer.render_qr(black_box(&payload)))
    });

    group.bench_function("ticket_png", |b| {
        b.iter(|| renderer.ticket_png(black_box(&payload)))
    });

    group.finish();
}

fn benchmark_decode(c: &mut Criterion) {
    let renderer = TicketRenderer::new(4);
    let payload = QrPayload::new("K7vQ2mXr9LpA", RiderNumber::One);
    let ticket = GrayFrame::from_luma(renderer.render_qr(&payload).expect("Failed to render QR"));

    // A camera-sized frame with nothing in it
    let empty = GrayFrame::new(640, 480, vec![255; 640 * 480]).expect("Failed to build frame");

    let decoder = RqrrDecoder;
    let mut group = c.benchmark_group("frame_decoding");

    group.bench_function("ticket_frame", |b| {
        b.iter(|| decoder.decode(black_box(&ticket)))
    });

    group.bench_function("empty_frame", |b| {
        b.iter(|| decoder.decode(black_box(&empty)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_tickets, benchmark_decode);
criterion_main!(benches);
