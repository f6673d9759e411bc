//! jemalloc size classes.
//!
//! The allocator rounds every request up to the next size class. Classes
//! start at 8 bytes, step by 16 up to 128, and from there every doubling
//! is split into four evenly spaced classes (spacing = previous power / 4).
//! The table stops at 16 TiB; larger requests are returned unchanged.

/// Ascending, duplicate-free list of allocator size classes (64-bit jemalloc).
pub const SIZE_CLASSES: [u64; 157] = [
    8, 16, 32, 48,
    64, 80, 96, 112,
    128, 160, 192, 224,
    256, 320, 384, 448,
    512, 640, 768, 896,
    1024, 1280, 1536, 1792,
    2048, 2560, 3072, 3584,
    4096, 5120, 6144, 7168,
    8192, 10_240, 12_288, 14_336,
    16_384, 20_480, 24_576, 28_672,
    32_768, 40_960, 49_152, 57_344,
    65_536, 81_920, 98_304, 114_688,
    131_072, 163_840, 196_608, 229_376,
    262_144, 327_680, 393_216, 458_752,
    524_288, 655_360, 786_432, 917_504,
    1_048_576, 1_310_720, 1_572_864, 1_835_008,
    2_097_152, 2_621_440, 3_145_728, 3_670_016,
    4_194_304, 5_242_880, 6_291_456, 7_340_032,
    8_388_608, 10_485_760, 12_582_912, 14_680_064,
    16_777_216, 20_971_520, 25_165_824, 29_360_128,
    33_554_432, 41_943_040, 50_331_648, 58_720_256,
    67_108_864, 83_886_080, 100_663_296, 117_440_512,
    134_217_728, 167_772_160, 201_326_592, 234_881_024,
    268_435_456, 335_544_320, 402_653_184, 469_762_048,
    536_870_912, 671_088_640, 805_306_368, 939_524_096,
    1_073_741_824, 1_342_177_280, 1_610_612_736, 1_879_048_192,
    2_147_483_648, 2_684_354_560, 3_221_225_472, 3_758_096_384,
    4_294_967_296, 5_368_709_120, 6_442_450_944, 7_516_192_768,
    8_589_934_592, 10_737_418_240, 12_884_901_888, 15_032_385_536,
    17_179_869_184, 21_474_836_480, 25_769_803_776, 30_064_771_072,
    34_359_738_368, 42_949_672_960, 51_539_607_552, 60_129_542_144,
    68_719_476_736, 85_899_345_920, 103_079_215_104, 120_259_084_288,
    137_438_953_472, 171_798_691_840, 206_158_430_208, 240_518_168_576,
    274_877_906_944, 343_597_383_680, 412_316_860_416, 481_036_337_152,
    549_755_813_888, 687_194_767_360, 824_633_720_832, 962_072_674_304,
    1_099_511_627_776, 1_374_389_534_720, 1_649_267_441_664, 1_924_145_348_608,
    2_199_023_255_552, 2_748_779_069_440, 3_298_534_883_328, 3_848_290_697_216,
    4_398_046_511_104, 5_497_558_138_880, 6_597_069_766_656, 7_696_581_394_432,
    8_796_093_022_208, 10_995_116_277_760, 13_194_139_533_312, 15_393_162_788_864,
    17_592_186_044_416,
];

/// Returns the number of bytes the allocator actually hands out for a
/// request of `size` bytes.
///
/// This is the smallest entry of [`SIZE_CLASSES`] that is `>= size`, or
/// `size` itself if the request is larger than the biggest class.
#[must_use]
pub fn malloc_size(size: u64) -> u64 {
    let idx = SIZE_CLASSES.partition_point(|&class| class < size);
    match SIZE_CLASSES.get(idx) {
        Some(&class) => class,
        None => size,
    }
}
