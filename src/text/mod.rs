// Event-type text reduction — label normalization and stemming.
//
// The raw EVTYPE field is noisy free text: "TSTM WIND", "THUNDERSTORM
// WINDS", "Tstm Wind 45" all describe one phenomenon. These two stages
// collapse that vocabulary to a set of word stems the aggregation step
// can group on.

pub mod normalize;
pub mod stem;
