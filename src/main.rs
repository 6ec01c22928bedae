use anyhow::{bail, Context};
use csv_core::{ReadFieldResult, ReaderBuilder};
use itemset_mining::*;
use lasso::{Rodeo, RodeoResolver};
use std::fmt::{self, Write};
use std::io;
use std::str;
use tracing_subscriber::EnvFilter;

/// Reads one transaction per line of tab-separated item names. Repeated names within a line
/// count once, and blank lines and empty fields are skipped.
fn load_transactions<R: io::Read, K: Item + Default + lasso::Key>(
    mut input: R,
) -> anyhow::Result<(RodeoResolver<K>, Vec<Itemset<K>>)> {
    let mut inputbuf = [0; 16384];
    let mut fieldbuf = [0; 1024];
    let mut fieldlen = 0;
    let mut record = Vec::new();
    let mut transactions = Vec::new();
    let mut rodeo = Rodeo::new();
    let mut tsv = ReaderBuilder::new().delimiter(b'\t').build();

    loop {
        let read = input.read(&mut inputbuf)?;
        let mut bytes = &inputbuf[..read];
        loop {
            let (result, nin, nout) = tsv.read_field(bytes, &mut fieldbuf[fieldlen..]);
            bytes = &bytes[nin..];
            fieldlen += nout;
            match result {
                ReadFieldResult::InputEmpty => break,
                ReadFieldResult::OutputFull => {
                    bail!("item name too long on line {}", tsv.line());
                }
                ReadFieldResult::Field { record_end } => {
                    let field = str::from_utf8(&fieldbuf[..fieldlen])
                        .with_context(|| format!("item name on line {}", tsv.line()))?
                        .trim();
                    fieldlen = 0;

                    if !field.is_empty() {
                        record.push(rodeo.get_or_intern(field));
                    }

                    if record_end {
                        if !record.is_empty() {
                            transactions.push(Itemset::new(&record));
                        }
                        record.clear();
                    }
                }
                ReadFieldResult::End => {
                    return Ok((rodeo.into_resolver(), transactions));
                }
            }
        }
    }
}

fn fmt_itemset<K: Item + lasso::Key>(
    out: &mut String,
    resolver: &RodeoResolver<K>,
    itemset: &Itemset<K>,
) -> fmt::Result {
    out.write_char('{')?;
    for (idx, item) in itemset.iter().enumerate() {
        if idx > 0 {
            out.write_str(", ")?;
        }
        out.write_str(resolver.resolve(&item))?;
    }
    out.write_char('}')
}

fn report<K, M>(
    miner: M,
    resolver: &RodeoResolver<K>,
    transactions: &[Itemset<K>],
    minimum_support: f64,
    minimum_confidence: f64,
) -> anyhow::Result<()>
where
    K: Item + lasso::Key,
    M: FrequentItemsetMiner<K>,
{
    let result = miner
        .find_frequent_itemsets(transactions, minimum_support)
        .context("mining frequent itemsets")?;
    let rules = generate_rules(&result, minimum_confidence).context("generating rules")?;

    println!("transactions: {}", result.transaction_count());
    println!("frequent itemsets: {}", result.len());
    let mut line = String::new();
    for (itemset, count) in result.iter() {
        line.clear();
        fmt_itemset(&mut line, resolver, itemset)?;
        println!(
            "  {}: {:.4} ({})",
            line,
            count as f64 / result.transaction_count() as f64,
            count
        );
    }

    println!();
    println!("association rules: {}", rules.len());
    for (rule, confidence) in &rules {
        line.clear();
        fmt_itemset(&mut line, resolver, rule.antecedent())?;
        line.push_str(" -> ");
        fmt_itemset(&mut line, resolver, rule.consequent())?;
        println!("  {}: {:.4}", line, confidence);
    }

    Ok(())
}

fn parse_fraction(arg: Option<String>, default: f64, what: &str) -> anyhow::Result<f64> {
    match arg {
        None => Ok(default),
        Some(arg) => arg
            .parse()
            .with_context(|| format!("{} must be a number, got {:?}", what, arg)),
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let algorithm = args.next().unwrap_or_else(|| "fpgrowth".to_string());
    let minimum_support = parse_fraction(args.next(), 0.2, "minimum support")?;
    let minimum_confidence = parse_fraction(args.next(), 0.5, "minimum confidence")?;

    let (resolver, transactions) =
        load_transactions::<_, lasso::Spur>(io::stdin().lock()).context("reading transactions")?;
    tracing::info!(transactions = transactions.len(), "loaded transactions");

    match algorithm.as_str() {
        "apriori" => report(
            Apriori,
            &resolver,
            &transactions,
            minimum_support,
            minimum_confidence,
        ),
        "fpgrowth" => report(
            FpGrowth,
            &resolver,
            &transactions,
            minimum_support,
            minimum_confidence,
        ),
        other => bail!("unknown algorithm {:?}, expected apriori or fpgrowth", other),
    }
}
