//! Intervention Segmentation
//!
//! Splits a normalized series at intervention dates so each decline regime
//! (before a frac, after a sidetrack, ...) is fitted on its own. Segments
//! partition the series exactly: ordered, non-overlapping, contiguous, the
//! last one open-ended.

use chrono::NaiveDate;

use crate::types::{
    ArpsParams, DiagnosticKind, Diagnostics, InterventionMarker, NormalizedSeries, Segment,
};

/// One effective cut point after filtering and collapsing markers.
#[derive(Debug, Clone)]
struct Boundary {
    date: NaiveDate,
    kind: String,
    seed: Option<ArpsParams>,
}

/// Intervention-based series segmenter
pub struct Segmenter;

impl Segmenter {
    /// Partition `series` at the dates of `markers`.
    ///
    /// Markers on other wells or outside the observed date range are
    /// ignored with a warning. A marker on the first sample date does not
    /// split; it labels (and seeds) the first segment. Returns no segments
    /// for an empty series.
    pub fn segment(
        series: &NormalizedSeries,
        markers: &[InterventionMarker],
        diagnostics: &mut Diagnostics,
    ) -> Vec<Segment> {
        let (Some(first), Some(last)) = (series.first_date(), series.last_date()) else {
            return Vec::new();
        };
        let well_id = series.well_id.as_str();

        let boundaries = Self::boundaries(well_id, first, last, markers, diagnostics);

        // The first segment always starts at the first sample
        let mut opening: Option<&Boundary> = None;
        let mut cuts: Vec<&Boundary> = Vec::with_capacity(boundaries.len());
        for boundary in &boundaries {
            if boundary.date == first {
                opening = Some(boundary);
            } else {
                cuts.push(boundary);
            }
        }

        let mut starts: Vec<(NaiveDate, Option<&Boundary>)> = vec![(first, opening)];
        starts.extend(cuts.iter().map(|b| (b.date, Some(*b))));

        starts
            .iter()
            .enumerate()
            .map(|(index, &(start_date, boundary))| {
                let end_date = starts.get(index + 1).map(|&(next, _)| next);
                let samples = series
                    .samples
                    .iter()
                    .filter(|s| s.date >= start_date && end_date.map_or(true, |end| s.date < end))
                    .cloned()
                    .collect();
                Segment {
                    well_id: well_id.to_string(),
                    index,
                    start_date,
                    end_date,
                    samples,
                    trigger: boundary.map(|b| b.kind.clone()),
                    seed: boundary.and_then(|b| b.seed),
                    fit: None,
                }
            })
            .collect()
    }

    /// Drop unusable markers, order the rest and merge those sharing a date.
    fn boundaries(
        well_id: &str,
        first: NaiveDate,
        last: NaiveDate,
        markers: &[InterventionMarker],
        diagnostics: &mut Diagnostics,
    ) -> Vec<Boundary> {
        let mut usable: Vec<&InterventionMarker> = Vec::with_capacity(markers.len());
        for marker in markers {
            if marker.well_id != well_id {
                diagnostics.record(
                    well_id,
                    None,
                    DiagnosticKind::MarkerForeignWell,
                    format!(
                        "{} marker on {} belongs to well {}, ignored",
                        marker.kind, marker.date, marker.well_id
                    ),
                );
            } else if marker.date < first || marker.date > last {
                diagnostics.record(
                    well_id,
                    None,
                    DiagnosticKind::MarkerOutOfRange,
                    format!(
                        "{} marker on {} is outside production range {first}..={last}, ignored",
                        marker.kind, marker.date
                    ),
                );
            } else {
                usable.push(marker);
            }
        }

        // Stable: same-date markers keep input order
        usable.sort_by_key(|m| m.date);

        let mut boundaries: Vec<Boundary> = Vec::new();
        for group in usable.chunk_by(|a, b| a.date == b.date) {
            let seeded = group.iter().find(|m| m.seed.is_some());
            let leader = seeded.copied().unwrap_or(group[0]);

            if group.len() > 1 {
                let kinds: Vec<&str> = group.iter().map(|m| m.kind.as_str()).collect();
                diagnostics.record(
                    well_id,
                    None,
                    DiagnosticKind::MarkerCollapsed,
                    format!(
                        "{} markers on {} collapsed into one boundary ({}), keeping {}",
                        group.len(),
                        leader.date,
                        kinds.join(", "),
                        leader.kind
                    ),
                );
            }

            boundaries.push(Boundary {
                date: leader.date,
                kind: leader.kind.clone(),
                seed: leader.seed,
            });
        }
        boundaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sample;
    use chrono::{Datelike, Months};

    fn month(k: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, 1)
            .unwrap()
            .checked_add_months(Months::new(k))
            .unwrap()
    }

    fn series(months: u32) -> NormalizedSeries {
        NormalizedSeries {
            well_id: "W1".to_string(),
            samples: (0..months)
                .map(|k| Sample {
                    well_id: "W1".to_string(),
                    date: month(k),
                    rate: 1000.0 - f64::from(k),
                })
                .collect(),
        }
    }

    fn marker(k: u32, kind: &str) -> InterventionMarker {
        InterventionMarker::new("W1", month(k), kind)
    }

    fn assert_partition(series: &NormalizedSeries, segments: &[Segment]) {
        let total: usize = segments.iter().map(|s| s.samples.len()).sum();
        assert_eq!(total, series.len());
        assert_eq!(segments[0].start_date, series.first_date().unwrap());
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end_date, Some(pair[1].start_date));
        }
        assert!(segments.last().unwrap().is_open());
        for (i, seg) in segments.iter().enumerate() {
            assert_eq!(seg.index, i);
            assert!(seg.samples.iter().all(|s| seg.contains(s.date)));
        }
    }

    #[test]
    fn test_no_markers_single_open_segment() {
        let s = series(6);
        let segments = Segmenter::segment(&s, &[], &mut Diagnostics::new());
        assert_eq!(segments.len(), 1);
        assert_partition(&s, &segments);
        assert!(segments[0].trigger.is_none());
    }

    #[test]
    fn test_marker_splits_at_its_date() {
        let s = series(12);
        let segments = Segmenter::segment(&s, &[marker(5, "frac")], &mut Diagnostics::new());

        assert_eq!(segments.len(), 2);
        assert_partition(&s, &segments);
        assert_eq!(segments[0].samples.len(), 5);
        assert_eq!(segments[1].start_date, month(5));
        assert_eq!(segments[1].trigger.as_deref(), Some("frac"));
    }

    #[test]
    fn test_unsorted_markers_are_ordered() {
        let s = series(12);
        let markers = vec![marker(9, "sidetrack"), marker(3, "frac")];
        let segments = Segmenter::segment(&s, &markers, &mut Diagnostics::new());

        assert_eq!(segments.len(), 3);
        assert_partition(&s, &segments);
        assert_eq!(segments[1].trigger.as_deref(), Some("frac"));
        assert_eq!(segments[2].trigger.as_deref(), Some("sidetrack"));
    }

    #[test]
    fn test_out_of_range_and_foreign_markers_ignored() {
        let s = series(6);
        let before = InterventionMarker::new(
            "W1",
            NaiveDate::from_ymd_opt(2020, 6, 1).unwrap(),
            "frac",
        );
        let after = marker(20, "frac");
        let foreign = InterventionMarker::new("W2", month(2), "frac");
        let mut diags = Diagnostics::new();

        let segments = Segmenter::segment(&s, &[before, after, foreign], &mut diags);

        assert_eq!(segments.len(), 1);
        assert_eq!(diags.count(DiagnosticKind::MarkerOutOfRange), 2);
        assert_eq!(diags.count(DiagnosticKind::MarkerForeignWell), 1);
    }

    #[test]
    fn test_marker_on_first_date_labels_first_segment() {
        let s = series(6);
        let seed = ArpsParams::exponential(900.0, 0.05);
        let mut diags = Diagnostics::new();
        let segments =
            Segmenter::segment(&s, &[marker(0, "completion").with_seed(seed)], &mut diags);

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].trigger.as_deref(), Some("completion"));
        assert_eq!(segments[0].seed, Some(seed));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_same_date_markers_collapse_seed_wins() {
        let s = series(8);
        let seed = ArpsParams::new(700.0, 0.5, 0.1);
        let markers = vec![
            marker(4, "acid"),
            marker(4, "frac").with_seed(seed),
            marker(4, "workover").with_seed(ArpsParams::exponential(1.0, 1.0)),
        ];
        let mut diags = Diagnostics::new();
        let segments = Segmenter::segment(&s, &markers, &mut diags);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].trigger.as_deref(), Some("frac"));
        assert_eq!(segments[1].seed, Some(seed));
        assert_eq!(diags.count(DiagnosticKind::MarkerCollapsed), 1);
    }

    #[test]
    fn test_adjacent_markers_may_leave_empty_segment() {
        // Samples on the 1st; markers mid-month leave a sample-free window
        let s = series(4);
        let mid = |k: u32, day: u32| {
            InterventionMarker::new("W1", month(k).with_day(day).unwrap(), "frac")
        };
        let segments =
            Segmenter::segment(&s, &[mid(1, 10), mid(1, 20)], &mut Diagnostics::new());

        assert_eq!(segments.len(), 3);
        assert_partition(&s, &segments);
        assert!(segments[1].samples.is_empty());
    }

    #[test]
    fn test_marker_on_last_date_opens_final_segment() {
        let s = series(6);
        let segments = Segmenter::segment(&s, &[marker(5, "frac")], &mut Diagnostics::new());
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].samples.len(), 1);
    }

    #[test]
    fn test_empty_series_has_no_segments() {
        let s = NormalizedSeries {
            well_id: "W1".to_string(),
            samples: Vec::new(),
        };
        assert!(Segmenter::segment(&s, &[marker(0, "frac")], &mut Diagnostics::new()).is_empty());
    }
}
