#![no_main]

use libfuzzer_sys::fuzz_target;
use pipeline_core::{InstructionRecord, Machine, MachineConfig, Program};

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };

    for line in source.lines() {
        let _ = InstructionRecord::parse(line);
    }

    let Ok(program) = Program::parse(source) else {
        return;
    };
    let config = MachineConfig {
        step_limit: Some(256),
        snapshot_on_retire: false,
        ..MachineConfig::default()
    };
    let mut machine = Machine::new(program, config);
    let _ = machine.run();
    let _ = machine.snapshot();
});
