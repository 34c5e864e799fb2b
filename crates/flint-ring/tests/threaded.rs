//! Cross-thread stress test: every record published is consumed exactly
//! once, in order.

use std::thread;

use flint_ring::ring;

#[test]
fn producer_and_consumer_on_separate_threads() {
    const COUNT: u64 = 100_000;
    let (mut producer, mut consumer) = ring::<u64>(1024);

    let publisher = thread::spawn(move || {
        for i in 0..COUNT {
            while !producer.try_publish(i) {
                thread::yield_now();
            }
        }
    });

    let mut expected = 0;
    while expected < COUNT {
        match consumer.try_consume() {
            Some(value) => {
                assert_eq!(value, expected);
                expected += 1;
            }
            None => thread::yield_now(),
        }
    }
    assert_eq!(consumer.try_consume(), None);

    publisher.join().expect("publisher thread panicked");
}
