#![no_main]

use codec::UpdateCodec;
use libfuzzer_sys::fuzz_target;
use replica::{ReplicationConfig, ShadowStore};

fuzz_target!(|data: &[u8]| {
    let config = ReplicationConfig::for_testing();
    let (Ok(mut store), Ok(codec)) = (
        ShadowStore::new(&config),
        UpdateCodec::new(
            config.precision_bits,
            config.wire_limits.clone(),
            config.codec_limits.clone(),
        ),
    ) else {
        return;
    };

    // The store accepts exactly what the codec accepts.
    assert_eq!(store.unpack_update(data).is_ok(), codec.decode(data).is_ok());

    // Replay chunks so later packets land on earlier shadows. A rejected
    // packet changes nothing.
    let mut idx = 0usize;
    while idx < data.len() && idx < 4096 {
        let len = (data[idx] as usize % 200).saturating_add(1);
        idx += 1;
        let end = (idx + len).min(data.len());
        let before: Vec<_> = store.iter().map(|(id, state)| (id, state.clone())).collect();
        if store.unpack_update(&data[idx..end]).is_err() {
            let after: Vec<_> = store.iter().map(|(id, state)| (id, state.clone())).collect();
            assert_eq!(before, after);
        }
        idx = end;
    }
});
