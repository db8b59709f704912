use console::Style;
use centaur_core::pipeline::BatchSummary;
use centaur_core::policy::Severity;
use centaur_core::report::Report;
use centaur_core::sink::Summary;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    good: Style,
    warn: Style,
    bad: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            good: Style::new().green(),
            warn: Style::new().yellow(),
            bad: Style::new().red().bold(),
            path: Style::new().underlined(),
        }
    }

    fn severity(&self, severity: Severity) -> &Style {
        match severity {
            Severity::None => &self.good,
            Severity::Minor | Severity::Moderate => &self.warn,
            Severity::High | Severity::Critical => &self.bad,
        }
    }
}

fn secs(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.0}s"))
}

fn num(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.decimals$}"))
}

pub fn print_report(report: &Report) {
    let s = Styles::new();
    let info = &report.file_info;
    let a = &report.analysis;

    println!();
    println!("  {}", s.title.apply_to(&info.filename));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Object"),
        s.value.apply_to(&info.object)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Filter"),
        s.value.apply_to(&info.filter)
    );
    println!("  {:<14}{}", s.label.apply_to("Rig"), s.value.apply_to(&info.rig));
    println!(
        "  {:<14}{}x{}",
        s.label.apply_to("Dimensions"),
        info.dimensions.0,
        info.dimensions.1
    );
    println!();

    println!("  {}", s.header.apply_to("Exposure"));
    println!(
        "    {:<16}{}",
        s.label.apply_to("Current"),
        s.value.apply_to(secs(a.current_exposure))
    );
    println!(
        "    {:<16}{} ({})",
        s.label.apply_to("Recommended"),
        s.value.apply_to(secs(a.recommended_exposure)),
        a.optimization_reason
    );
    if let Some(sho) = &a.sho_recommendation {
        println!(
            "    {:<16}{}",
            s.label.apply_to("SII/OIII"),
            s.value.apply_to(format!("{:.0}s", sho.recommended_exposure))
        );
    }
    if a.optimal_sub_length.is_some() {
        println!(
            "    {:<16}{}",
            s.label.apply_to("Optimal sub"),
            s.value.apply_to(secs(a.optimal_sub_length))
        );
    }

    println!("  {}", s.header.apply_to("Quality"));
    println!(
        "    {:<16}{}",
        s.label.apply_to("Background SNR"),
        s.value
            .apply_to(num(a.snr_metrics.as_ref().map(|m| m.snr_background), 2))
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Sky mag/\"²"),
        s.value.apply_to(num(
            a.sky_brightness.as_ref().and_then(|b| b.mag_per_arcsec2),
            2
        ))
    );
    if let Some(sat) = &a.saturation_analysis {
        println!(
            "    {:<16}{} ({:.3}% near saturation)",
            s.label.apply_to("Saturation"),
            s.severity(sat.severity).apply_to(sat.severity),
            sat.near_saturated_percent
        );
    }
    if let Some(noise) = &a.noise_regime {
        let regime = if noise.read_noise_dominant {
            s.warn.apply_to("read-noise limited")
        } else {
            s.good.apply_to("sky-noise limited")
        };
        println!("    {:<16}{}", s.label.apply_to("Noise"), regime);
    }

    if !report.recommendations.is_empty() {
        println!("  {}", s.header.apply_to("Recommendations"));
        for line in &report.recommendations {
            println!("    - {line}");
        }
    }
}

pub fn print_batch(summary: &BatchSummary) {
    let s = Styles::new();
    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Processed"),
        s.good.apply_to(summary.processed.len())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Skipped"),
        s.value.apply_to(summary.skipped)
    );
    if !summary.failed.is_empty() {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Failed"),
            s.bad.apply_to(summary.failed.len())
        );
        for failure in &summary.failed {
            println!(
                "    {} {}",
                s.path.apply_to(failure.path.display()),
                s.label.apply_to(&failure.reason)
            );
        }
    }
    for path in &summary.quarantined {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Quarantined"),
            s.warn.apply_to(path.display())
        );
    }
}

pub fn print_summary(summary: &Summary) {
    let s = Styles::new();
    println!();
    println!(
        "  {}",
        s.title
            .apply_to(format!("{} files by {}", summary.total_files, summary.group_by))
    );

    for cohort in &summary.cohorts {
        println!();
        println!(
            "  {} {}",
            s.header.apply_to(&cohort.key),
            s.label.apply_to(format!("({} files)", cohort.file_count))
        );
        println!(
            "    {:<18}{}",
            s.label.apply_to("Mean exposure"),
            s.value.apply_to(secs(cohort.mean_current_exposure))
        );
        println!(
            "    {:<18}{}",
            s.label.apply_to("Mean recommended"),
            s.value.apply_to(secs(cohort.mean_recommended_exposure))
        );
        println!(
            "    {:<18}{}",
            s.label.apply_to("Mean SII/OIII"),
            s.value.apply_to(secs(cohort.mean_sho_exposure))
        );
        println!(
            "    {:<18}{}",
            s.label.apply_to("Mean SNR"),
            s.value.apply_to(num(cohort.mean_snr_background, 2))
        );
        if let Some(sky) = &cohort.sky_brightness {
            println!(
                "    {:<18}{} ({:.2} to {:.2})",
                s.label.apply_to("Sky mag/\"²"),
                s.value.apply_to(format!("{:.2}", sky.mean)),
                sky.min,
                sky.max
            );
        }
        for (severity, count) in &cohort.severity_counts {
            println!(
                "    {:<18}{}",
                s.severity(*severity).apply_to(severity),
                count
            );
        }
        for (line, count) in &cohort.top_recommendations {
            println!("    {} {line}", s.label.apply_to(format!("{count}x")));
        }
    }

    if !summary.quarantined.is_empty() {
        println!();
        println!("  {}", s.warn.apply_to("Quarantined files"));
        for record in &summary.quarantined {
            println!(
                "    {} {}",
                s.path.apply_to(record.path.display()),
                s.label.apply_to(format!("after {} attempts", record.attempts))
            );
        }
    }
}
